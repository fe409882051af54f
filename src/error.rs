use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the recipe API or managing state
#[derive(Error, Debug)]
pub enum ForkifyError {
    /// The API answered with a non-success status
    #[error("{message} ({status})")]
    RequestError { message: String, status: u16 },

    /// No complete response arrived in time
    #[error("Request took too long! Timeout after {0:?}")]
    TimeoutError(Duration),

    /// User input could not be accepted
    #[error("{0}")]
    ValidationError(String),

    /// An operation needed a current recipe but none was loaded
    #[error("No recipe loaded")]
    NoRecipeLoaded,

    /// Transport-level failure (connection refused, TLS, body read...)
    #[error("Failed to fetch: {0}")]
    FetchError(#[from] reqwest::Error),

    /// JSON did not match the expected shape
    #[error("Failed to decode JSON: {0}")]
    DecodeError(#[from] serde_json::Error),

    /// Bookmark storage could not be read or written
    #[error("Storage error: {0}")]
    StorageError(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

impl ForkifyError {
    /// HTTP status carried by a request error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ForkifyError::RequestError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
