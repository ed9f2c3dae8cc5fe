//! Error types for cardkit core.

use thiserror::Error;

use crate::types::CardId;

/// Errors raised by the crypto capability and wire decoding.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("malformed model: {0}")]
    MalformedModel(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

impl From<base64::DecodeError> for CoreError {
    fn from(e: base64::DecodeError) -> Self {
        CoreError::DecodingError(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::DecodingError(e.to_string())
    }
}

/// Malformed input to a builder. Raised synchronously and never retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("duplicate signature: signer {signer:?} already signed this model")]
    DuplicateSignature { signer: String },

    #[error("identity must not be empty")]
    EmptyIdentity,

    #[error("signer id must not be empty")]
    EmptySigner,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("malformed input: {0}")]
    Malformed(String),
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidPublicKey => ValidationError::InvalidPublicKey,
            CoreError::InvalidSignature => ValidationError::SigningFailed("invalid signature".into()),
            CoreError::MalformedModel(msg)
            | CoreError::EncodingError(msg)
            | CoreError::DecodingError(msg) => ValidationError::Malformed(msg),
        }
    }
}

/// A card failed a trust check. Always surfaced; never downgraded.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("card id mismatch: expected {expected}, computed {actual}")]
    IdMismatch { expected: CardId, actual: CardId },

    #[error("card {card_id} rejected by trust policy")]
    PolicyRejected { card_id: CardId },

    #[error("card {card_id} has unexpected identity {identity:?}")]
    UnexpectedIdentity { card_id: CardId, identity: String },

    #[error("content snapshot of card {card_id} was altered by the service")]
    SnapshotMismatch { card_id: CardId },
}
