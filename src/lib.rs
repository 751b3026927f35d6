pub mod config;
pub mod error;
pub mod db;
pub mod graph;
pub mod http;

pub use config::Config;
pub use error::{RelgraphError, Result};
pub use graph::{GraphDocument, GraphQuery, GraphService};
