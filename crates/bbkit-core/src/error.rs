//! Error types for bbkit.

use thiserror::Error;

/// Main error type for bbkit operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An operation that needs credentials was called without them
    #[error("{operation} requires authentication")]
    AuthenticationRequired { operation: String },

    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(String),

    /// API returned a non-success status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body was not what we expected
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Build an error from a non-success HTTP status and response body.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether this error came from the transport or the response body
    /// rather than from the caller.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Api { .. } | Error::InvalidData(_)
        )
    }
}

/// Result type alias for bbkit operations.
pub type Result<T> = std::result::Result<T, Error>;
