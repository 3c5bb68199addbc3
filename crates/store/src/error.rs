//! Store error types

/// Errors that can occur during store access
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Query execution failed or timed out
    #[error("query execution failed: {0}")]
    Execution(String),

    /// Invalid SQL (only SELECT/WITH allowed)
    #[error("invalid SQL: {0}")]
    InvalidSql(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
