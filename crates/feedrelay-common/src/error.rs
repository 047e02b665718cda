//! Error types shared by the feedrelay jobs

use thiserror::Error;

/// Result type alias for feedrelay operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Main error type for feedrelay jobs
///
/// Transport-specific errors (sqlx, AWS SDK, suppaftp) are flattened into
/// string-carrying variants at the call site; the variant tells the operator
/// which external system misbehaved.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Object storage error: {0}")]
    Storage(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Remote endpoint error: {0}")]
    Remote(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FeedError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a database error from any displayable source
    pub fn database(source: impl std::fmt::Display) -> Self {
        Self::Database(source.to_string())
    }

    /// Create an object-storage error from any displayable source
    pub fn storage(source: impl std::fmt::Display) -> Self {
        Self::Storage(source.to_string())
    }

    /// Create a queue error from any displayable source
    pub fn queue(source: impl std::fmt::Display) -> Self {
        Self::Queue(source.to_string())
    }

    /// Create a remote-endpoint error from any displayable source
    pub fn remote(source: impl std::fmt::Display) -> Self {
        Self::Remote(source.to_string())
    }

    /// Create a network error from any displayable source
    pub fn network(source: impl std::fmt::Display) -> Self {
        Self::Network(source.to_string())
    }

    /// Create a parse error from any displayable source
    pub fn parse(source: impl std::fmt::Display) -> Self {
        Self::Parse(source.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(FeedError::config("bad"), FeedError::Config(_)));
        assert!(matches!(FeedError::database("down"), FeedError::Database(_)));
        assert!(matches!(FeedError::queue("down"), FeedError::Queue(_)));
    }

    #[test]
    fn test_display_names_the_system() {
        let err = FeedError::Storage("bucket missing".to_string());
        assert_eq!(err.to_string(), "Object storage error: bucket missing");
    }
}
