//! Cytoscape-style exchange document for the visualization front end.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Map;

use crate::graph::network::{NodeData, RelGraph};
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct NodeElement {
    pub data: NodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeElementData {
    pub source: String,
    pub target: String,
    pub weight: f64,
    #[serde(flatten)]
    pub attrs: Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeElement {
    pub data: EdgeElementData,
}

#[derive(Debug, Clone, Serialize)]
pub struct Elements {
    pub nodes: Vec<NodeElement>,
    pub edges: Vec<EdgeElement>,
}

/// Request echo and counts shown next to the rendered graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphMeta {
    pub node_count: usize,
    pub edge_count: usize,
    pub src: Option<String>,
    pub dist: Option<usize>,
    pub target: Option<String>,
    pub ignore: Vec<String>,
    pub weight_factor: f64,
    /// Effective simple-path cutoff after clamping.
    pub cutoff: usize,
    /// Source rows dropped for unusable weights or NULL ids.
    pub rejected_rows: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphDocument {
    pub directed: bool,
    pub multigraph: bool,
    pub elements: Elements,
    pub meta: GraphMeta,
}

impl GraphDocument {
    /// Encode as JSON text, indented when `pretty`.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }
}

/// Node and edge lists in a canonical order: nodes by id; edges with
/// `source <= target`, sorted by that pair.
pub fn to_elements(graph: &RelGraph) -> Elements {
    let mut nodes: Vec<NodeElement> = graph
        .nodes()
        .map(|n| NodeElement { data: n.clone() })
        .collect();
    nodes.sort_by(|a, b| a.data.id.cmp(&b.data.id));

    let mut edges: Vec<EdgeElement> = graph
        .edges()
        .map(|(a, b, e)| {
            let (source, target) = if a <= b { (a, b) } else { (b, a) };
            EdgeElement {
                data: EdgeElementData {
                    source: source.to_string(),
                    target: target.to_string(),
                    weight: e.weight,
                    attrs: e.attrs.clone(),
                },
            }
        })
        .collect();
    edges.sort_by(|a, b| {
        (&a.data.source, &a.data.target).cmp(&(&b.data.source, &b.data.target))
    });

    Elements { nodes, edges }
}

/// Wrap the final graph with request metadata. Counts are taken from `graph`.
pub fn to_document(graph: &RelGraph, mut meta: GraphMeta) -> GraphDocument {
    meta.node_count = graph.node_count();
    meta.edge_count = graph.edge_count();
    GraphDocument {
        directed: false,
        multigraph: false,
        elements: to_elements(graph),
        meta,
    }
}
