//! Error types for the card manager.

use cardkit_auth::AuthError;
use cardkit_core::{CoreError, ValidationError, VerificationError};
use cardkit_transport::TransportError;
use thiserror::Error;

/// Errors that can occur during manager operations.
///
/// A manager call either returns fully verified cards or one of these.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Malformed builder input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A card failed a trust check.
    #[error("verification error: {0}")]
    Verification(#[from] VerificationError),

    /// A wire model could not be decoded.
    #[error("malformed card: {0}")]
    Malformed(#[from] CoreError),

    /// The token provider failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// The directory call failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The co-signer failed.
    #[error("co-signer failed: {0}")]
    CoSigner(#[source] anyhow::Error),
}

impl ManagerError {
    /// Whether the error means the card cannot be trusted.
    pub fn is_verification(&self) -> bool {
        matches!(self, ManagerError::Verification(_))
    }
}

/// Result type for manager operations.
pub type Result<T> = std::result::Result<T, ManagerError>;
