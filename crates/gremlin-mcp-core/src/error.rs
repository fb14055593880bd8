//! Error types for gremlin-mcp core

use thiserror::Error;

/// Result type alias using the core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
///
/// `Connectivity`, `Timeout` and `Validation` are the kinds schema generation
/// can fail with; callers match on them to decide whether to retry, surface the
/// failure, or fall back to a previously cached schema.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Graph connectivity error: {0}")]
    Connectivity(String),

    #[error("Schema generation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Schema validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported traversal: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether a later attempt may succeed without operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::Timeout { .. })
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity(message.into())
    }
}
