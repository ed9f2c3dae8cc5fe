//! Error types for the auth module.

use thiserror::Error;

/// Errors that can occur while issuing, parsing, or fetching tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token identity was empty.
    #[error("identity must not be empty")]
    EmptyIdentity,

    /// Additional data was present but not a JSON object.
    #[error("additional data must be a JSON object, got {0}")]
    InvalidAdditionalData(&'static str),

    /// Token string could not be parsed.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Signing the token failed.
    #[error("token signing failed: {0}")]
    SigningFailed(String),

    /// A token provider could not produce a token.
    #[error("token provider error: {0}")]
    Provider(String),
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
