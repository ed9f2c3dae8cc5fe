//! The raw signed model: the transitional wire form of a card.
//!
//! ```text
//! {"content_snapshot":"<base64>","signatures":[{"signer":"<id>","signature":"<base64>","signature_snapshot":"<base64>"?}]}
//! ```
//!
//! The string form of a model is standard base64 over that JSON.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::encoding::{base64_bytes, base64_opt};
use crate::error::CoreError;
use crate::snapshot::RawCardContent;

/// One signature as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature {
    pub signer: String,

    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,

    /// Extra bytes appended to the content snapshot before signing.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    pub signature_snapshot: Option<Vec<u8>>,
}

/// A content snapshot plus its ordered signature list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignedModel {
    #[serde(with = "base64_bytes")]
    pub content_snapshot: Vec<u8>,

    #[serde(default)]
    pub signatures: Vec<RawSignature>,
}

impl RawSignedModel {
    /// Wrap a content snapshot with no signatures yet.
    pub fn new(content_snapshot: Vec<u8>) -> Self {
        Self {
            content_snapshot,
            signatures: Vec::new(),
        }
    }

    /// Check whether a signer already signed this model.
    pub fn has_signer(&self, signer: &str) -> bool {
        self.signatures.iter().any(|s| s.signer == signer)
    }

    /// Find the signature of a given signer.
    pub fn signature_of(&self, signer: &str) -> Option<&RawSignature> {
        self.signatures.iter().find(|s| s.signer == signer)
    }

    /// Parse the content snapshot.
    pub fn content(&self) -> Result<RawCardContent, CoreError> {
        RawCardContent::from_snapshot(&self.content_snapshot)
    }

    /// Serialize to compact JSON.
    pub fn to_json_string(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Serialize to a `serde_json::Value`.
    pub fn to_json_value(&self) -> Result<serde_json::Value, CoreError> {
        serde_json::to_value(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Parse from JSON text.
    pub fn from_json_str(s: &str) -> Result<Self, CoreError> {
        serde_json::from_str(s).map_err(|e| CoreError::MalformedModel(e.to_string()))
    }

    /// Parse from an already decoded JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, CoreError> {
        serde_json::from_value(value).map_err(|e| CoreError::MalformedModel(e.to_string()))
    }

    /// Serialize to base64-wrapped JSON.
    pub fn to_base64_string(&self) -> Result<String, CoreError> {
        Ok(STANDARD.encode(self.to_json_string()?))
    }

    /// Parse base64-wrapped JSON.
    pub fn from_base64_str(s: &str) -> Result<Self, CoreError> {
        let json = STANDARD.decode(s.trim().as_bytes())?;
        serde_json::from_slice(&json).map_err(|e| CoreError::MalformedModel(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawSignedModel {
        RawSignedModel {
            content_snapshot: b"{\"identity\":\"x\"}".to_vec(),
            signatures: vec![
                RawSignature {
                    signer: "self".into(),
                    signature: vec![1, 2, 3],
                    signature_snapshot: None,
                },
                RawSignature {
                    signer: "virgil".into(),
                    signature: vec![4, 5, 6],
                    signature_snapshot: Some(b"meta".to_vec()),
                },
            ],
        }
    }

    #[test]
    fn test_json_layout() {
        let json = sample().to_json_string().unwrap();
        assert_eq!(
            json,
            r#"{"content_snapshot":"eyJpZGVudGl0eSI6IngifQ==","signatures":[{"signer":"self","signature":"AQID"},{"signer":"virgil","signature":"BAUG","signature_snapshot":"bWV0YQ=="}]}"#
        );
    }

    #[test]
    fn test_string_form_roundtrip_is_byte_identical() {
        let s = sample().to_base64_string().unwrap();
        let parsed = RawSignedModel::from_base64_str(&s).unwrap();
        assert_eq!(parsed, sample());
        assert_eq!(parsed.to_base64_string().unwrap(), s);
    }

    #[test]
    fn test_missing_signatures_defaults_empty() {
        let model = RawSignedModel::from_json_str(r#"{"content_snapshot":"AQID"}"#).unwrap();
        assert!(model.signatures.is_empty());
        assert_eq!(model.content_snapshot, vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(RawSignedModel::from_json_str("{").is_err());
        assert!(RawSignedModel::from_json_str(r#"{"content_snapshot":"!!!"}"#).is_err());
        assert!(RawSignedModel::from_base64_str("%%%").is_err());
    }

    #[test]
    fn test_signer_lookup() {
        let model = sample();
        assert!(model.has_signer("self"));
        assert!(!model.has_signer("other"));
        assert_eq!(model.signature_of("virgil").unwrap().signature, vec![4, 5, 6]);
    }
}
