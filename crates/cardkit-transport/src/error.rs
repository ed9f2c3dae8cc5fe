//! Error types for the transport module.

use thiserror::Error;

/// Errors reported by a directory transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The bearer token was rejected or has expired.
    ///
    /// The only transport error the manager retries.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No card with the requested id.
    #[error("not found: {0}")]
    NotFound(String),

    /// The directory refused the request as invalid.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The card already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other HTTP-level failure.
    #[error("http error ({status}): {message}")]
    Http { status: u16, message: String },

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),
}

impl TransportError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TransportError::Unauthorized(_))
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
