//! Load → build → filter → serialize, for one request.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;

use crate::config::{Config, GraphSettings};
use crate::db::Db;
use crate::graph::builder::GraphBuilder;
use crate::graph::filter::apply_filters;
use crate::graph::loader::load_all;
use crate::graph::query::GraphQuery;
use crate::graph::serialize::{to_document, GraphDocument, GraphMeta};
use crate::graph::source::EdgeSourceConfig;
use crate::Result;

/// Run one graph request against an open connection.
///
/// Any load failure aborts the request; there is no partial graph.
pub fn run_graph_query(
    conn: &Connection,
    sources: &[EdgeSourceConfig],
    settings: &GraphSettings,
    query: &GraphQuery,
) -> Result<GraphDocument> {
    query.validate()?;

    let loaded = load_all(conn, sources, &query.load_filters(), &query.ignore_ttype)?;
    let mut builder = GraphBuilder::new(query.weight_factor);
    builder.add_sources(&loaded)?;
    let (graph, stats) = builder.finish();

    let graph = apply_filters(graph, &query.filter_options(settings))?;

    let meta = GraphMeta {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        src: query.src.clone(),
        dist: query.dist,
        target: query.target.clone(),
        ignore: query.ignore.clone(),
        weight_factor: query.weight_factor,
        cutoff: query.effective_cutoff(settings),
        rejected_rows: stats.rejected(),
        generated_at: Utc::now(),
    };
    Ok(to_document(&graph, meta))
}

/// Graph queries over the configured database. Cheap to clone.
#[derive(Clone)]
pub struct GraphService {
    db: Arc<Db>,
    config: Arc<Config>,
}

impl GraphService {
    pub fn new(db: Db, config: Arc<Config>) -> Self {
        Self {
            db: Arc::new(db),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `query` on a blocking thread with a single read-only session.
    pub async fn query(&self, query: GraphQuery) -> Result<GraphDocument> {
        let config = Arc::clone(&self.config);
        let start = std::time::Instant::now();
        let doc = self
            .db
            .with_connection(move |conn| run_graph_query(conn, &config.sources, &config.graph, &query))
            .await?;
        log::info!(
            "Graph query: {} nodes, {} edges in {}ms",
            doc.meta.node_count,
            doc.meta.edge_count,
            start.elapsed().as_millis()
        );
        Ok(doc)
    }
}
