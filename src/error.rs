use thiserror::Error;

/// Main error type for relgraph
#[derive(Error, Debug)]
pub enum RelgraphError {
    /// Relational read failures (connectivity, malformed query, permissions)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Edge source or server configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A node requested for ego or path extraction is not in the built graph
    #[error("Node not in graph: {0}")]
    NodeNotInGraph(String),

    /// Malformed request parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Output encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenient Result type using RelgraphError
pub type Result<T> = std::result::Result<T, RelgraphError>;
