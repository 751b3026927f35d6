use clap::Parser;
use relgraph::db::Db;
use relgraph::graph::query::{split_list, GraphQuery};
use relgraph::graph::run_graph_query;
use relgraph::Config;
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "relgraph-query")]
#[command(about = "Build one graph from the configured edge sources and print it as JSON")]
struct Args {
    /// Edge weight = weightfactor / raw closeness
    #[arg(long)]
    weightfactor: Option<f64>,

    /// Minimum raw closeness per source
    #[arg(long, default_value_t = 0.0)]
    min: f64,

    /// Entity ids excluded from every source (comma-separated)
    #[arg(long)]
    superignore: Option<String>,

    /// Keep edges where either endpoint carries one of these tags (comma-separated)
    #[arg(long)]
    only_one: Option<String>,

    /// Keep edges where both endpoints carry one of these tags (comma-separated)
    #[arg(long)]
    only_both: Option<String>,

    /// Source tables to skip (comma-separated)
    #[arg(long)]
    ignore_ttype: Option<String>,

    /// Origin node for ego or path queries
    #[arg(long)]
    src: Option<String>,

    /// Ego radius in hops
    #[arg(long)]
    dist: Option<usize>,

    /// Destination node for path queries
    #[arg(long)]
    target: Option<String>,

    /// Only shortest paths
    #[arg(long)]
    shortest_only: bool,

    /// Compare shortest paths by edge weight instead of hop count
    #[arg(long)]
    no_ignore_weights: bool,

    /// Simple-path hop limit (clamped to the server maximum)
    #[arg(long)]
    cutoff: Option<usize>,

    /// Node ids removed from the result (comma-separated)
    #[arg(long)]
    ignore: Option<String>,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,
}

impl Args {
    fn into_query(self, config: &Config) -> GraphQuery {
        let list = |v: Option<String>| v.as_deref().map(split_list).unwrap_or_default();
        let mut query = GraphQuery::with_defaults(&config.graph);
        if let Some(w) = self.weightfactor {
            query.weight_factor = w;
        }
        if let Some(c) = self.cutoff {
            query.cutoff = c;
        }
        query.min_weight = self.min;
        query.superignore = list(self.superignore);
        query.only_one = list(self.only_one);
        query.only_both = list(self.only_both);
        query.ignore_ttype = list(self.ignore_ttype);
        query.src = self.src;
        query.dist = self.dist;
        query.target = self.target;
        query.shortest_only = self.shortest_only;
        query.no_ignore_weights = self.no_ignore_weights;
        query.ignore = list(self.ignore);
        query
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();
    let compact = args.compact;

    let config = Config::load()?;
    let query = args.into_query(&config);
    log::info!("Query: {:?}", query);

    let db = Db::new(config.db_path());
    let conn = db.open_connection()?;
    let doc = run_graph_query(&conn, &config.sources, &config.graph, &query)?;

    println!("{}", doc.to_json(!compact)?);

    Ok(())
}
