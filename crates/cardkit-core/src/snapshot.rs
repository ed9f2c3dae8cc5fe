//! Canonical content snapshots.
//!
//! A content snapshot is compact JSON with keys in sorted order:
//!
//! ```text
//! {"created_at":<int>,"identity":"<string>","previous_card_id":"<hex>","public_key":"<base64>","version":"5.0"}
//! ```
//!
//! `previous_card_id` is omitted entirely when absent. The bytes are signed
//! and hashed into the card id, so this layout is FROZEN. Field order in
//! [`RawCardContent`] is the key order on the wire.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::CardId;

/// The current card wire format version.
pub const CARD_VERSION: &str = "5.0";

/// The typed body of a content snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCardContent {
    /// Unix timestamp (seconds) claimed by the card owner.
    pub created_at: i64,

    pub identity: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_card_id: Option<CardId>,

    /// Exported public key, standard base64.
    pub public_key: String,

    pub version: String,
}

impl RawCardContent {
    /// Assemble content from exported key bytes.
    pub fn new(
        identity: impl Into<String>,
        public_key: &[u8],
        created_at: i64,
        previous_card_id: Option<CardId>,
    ) -> Self {
        Self {
            created_at,
            identity: identity.into(),
            previous_card_id,
            public_key: STANDARD.encode(public_key),
            version: CARD_VERSION.to_string(),
        }
    }

    /// Decode the exported public key bytes.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, CoreError> {
        Ok(STANDARD.decode(&self.public_key)?)
    }

    /// Encode to canonical snapshot bytes.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Parse snapshot bytes.
    pub fn from_snapshot(snapshot: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(snapshot)
            .map_err(|e| CoreError::MalformedModel(format!("content snapshot: {}", e)))
    }
}

/// Build the canonical content snapshot for a card.
pub fn content_snapshot(
    identity: &str,
    public_key: &[u8],
    version: &str,
    created_at: i64,
    previous_card_id: Option<&CardId>,
) -> Result<Vec<u8>, CoreError> {
    let content = RawCardContent {
        created_at,
        identity: identity.to_string(),
        previous_card_id: previous_card_id.copied(),
        public_key: STANDARD.encode(public_key),
        version: version.to_string(),
    };
    content.to_snapshot()
}

/// Build the bytes a signer signs: the content snapshot, followed by the
/// signature snapshot when one is attached. Both are raw bytes.
pub fn signed_payload(content_snapshot: &[u8], signature_snapshot: Option<&[u8]>) -> Vec<u8> {
    let extra = signature_snapshot.unwrap_or_default();
    let mut buf = Vec::with_capacity(content_snapshot.len() + extra.len());
    buf.extend_from_slice(content_snapshot);
    buf.extend_from_slice(extra);
    buf
}
