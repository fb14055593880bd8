//! Backend error types

use thiserror::Error;

/// Result type alias for backend operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Backend-specific error types
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Lock error: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid graph data: {0}")]
    Data(String),

    #[error("Unknown vertex: {0}")]
    UnknownVertex(String),

    #[error("Duplicate vertex id: {0}")]
    DuplicateVertex(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gremlin Server returned status {code}: {message}")]
    Server { code: u16, message: String },

    #[error("Request timed out after {0:?}")]
    RequestTimeout(std::time::Duration),

    #[error("Malformed server response: {0}")]
    Response(String),
}

impl From<BackendError> for gremlin_mcp_core::Error {
    fn from(err: BackendError) -> Self {
        use gremlin_mcp_core::Error;
        match err {
            BackendError::Data(_)
            | BackendError::UnknownVertex(_)
            | BackendError::DuplicateVertex(_) => Error::InvalidInput(err.to_string()),
            BackendError::Config(_) => Error::InvalidInput(err.to_string()),
            other => Error::Connectivity(other.to_string()),
        }
    }
}
