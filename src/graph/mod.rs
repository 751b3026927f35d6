//! Graph engine: builds a weighted undirected graph from relational edge
//! sources and answers ego-network and path queries over it.
//!
//! The graph is rebuilt for every request and discarded after serialization.

pub mod builder;
pub mod filter;
pub mod loader;
pub mod network;
pub mod paths;
pub mod query;
pub mod serialize;
pub mod service;
pub mod source;

pub use builder::{BuildStats, GraphBuilder};
pub use filter::{apply_filters, FilterOptions, ViewSelection};
pub use loader::{load_all, LoadFilters, RawRow};
pub use network::{EdgeData, NodeData, RelGraph};
pub use paths::{find_paths, path_subgraph, PathMode, MAX_CUTOFF};
pub use query::GraphQuery;
pub use serialize::GraphDocument;
pub use service::{run_graph_query, GraphService};
pub use source::{EdgeSourceConfig, NodeIdStrategy, TagJunction};
