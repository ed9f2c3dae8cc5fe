//! Card: a signed, content-addressed binding of an identity to a public key.
//!
//! A card is rebuilt from its wire model and never edited in place. The only
//! mutations after construction are the search-scoped `is_outdated` flag and
//! the `previous_card` back-reference.

use std::collections::HashSet;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::crypto::{CardCrypto, PublicKey};
use crate::error::{CoreError, VerificationError};
use crate::model::{RawSignature, RawSignedModel};
use crate::snapshot::{signed_payload, RawCardContent};
use crate::types::CardId;

/// A detached signature attached to a card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardSignature {
    /// Signer id: `"self"`, `"virgil"`, or any other string.
    pub signer: String,

    /// Raw signature bytes.
    pub signature: Vec<u8>,

    /// Extra bytes appended to the content snapshot before signing.
    pub snapshot: Option<Bytes>,

    /// Structured view of `snapshot`, when it is a JSON object.
    pub extra_fields: Option<Map<String, Value>>,
}

impl CardSignature {
    /// Build from the wire form.
    pub fn from_raw(raw: &RawSignature) -> Self {
        let extra_fields = raw
            .signature_snapshot
            .as_deref()
            .and_then(|bytes| serde_json::from_slice::<Value>(bytes).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            });

        Self {
            signer: raw.signer.clone(),
            signature: raw.signature.clone(),
            snapshot: raw.signature_snapshot.clone().map(Bytes::from),
            extra_fields,
        }
    }

    /// Convert back to the wire form.
    pub fn to_raw(&self) -> RawSignature {
        RawSignature {
            signer: self.signer.clone(),
            signature: self.signature.clone(),
            signature_snapshot: self.snapshot.as_ref().map(|b| b.to_vec()),
        }
    }
}

/// A card reconstructed from a signed model.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    id: CardId,
    identity: String,
    public_key: PublicKey,
    version: String,
    created_at: i64,
    previous_card_id: Option<CardId>,
    content_snapshot: Bytes,
    signatures: Vec<CardSignature>,
    is_outdated: bool,
    previous_card: Option<Box<Card>>,
}

impl Card {
    /// Rebuild a card from its wire model.
    ///
    /// The id is derived from the snapshot here; callers holding a claimed id
    /// compare it with [`Card::check_id`]. A signer id may appear only once.
    pub fn from_signed_model(
        crypto: &dyn CardCrypto,
        model: &RawSignedModel,
    ) -> Result<Self, CoreError> {
        let mut signers = HashSet::new();
        if let Some(dup) = model
            .signatures
            .iter()
            .find(|s| !signers.insert(s.signer.as_str()))
        {
            return Err(CoreError::MalformedModel(format!(
                "signer {:?} appears more than once",
                dup.signer
            )));
        }

        let content = model.content()?;
        let public_key = crypto.import_public_key(&content.public_key_bytes()?)?;

        Ok(Self {
            id: CardId::derive(crypto, &model.content_snapshot),
            identity: content.identity,
            public_key,
            version: content.version,
            created_at: content.created_at,
            previous_card_id: content.previous_card_id,
            content_snapshot: Bytes::from(model.content_snapshot.clone()),
            signatures: model.signatures.iter().map(CardSignature::from_raw).collect(),
            is_outdated: false,
            previous_card: None,
        })
    }

    /// Convert back to the wire model, preserving snapshot and signature order.
    pub fn to_raw_model(&self) -> RawSignedModel {
        RawSignedModel {
            content_snapshot: self.content_snapshot.to_vec(),
            signatures: self.signatures.iter().map(CardSignature::to_raw).collect(),
        }
    }

    /// Recompute the id from the snapshot and compare it with a claimed id.
    pub fn check_id(
        &self,
        crypto: &dyn CardCrypto,
        claimed: &CardId,
    ) -> Result<(), VerificationError> {
        let actual = CardId::derive(crypto, &self.content_snapshot);
        if &actual != claimed {
            return Err(VerificationError::IdMismatch {
                expected: *claimed,
                actual,
            });
        }
        Ok(())
    }

    pub fn id(&self) -> &CardId {
        &self.id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Unix timestamp (seconds).
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn previous_card_id(&self) -> Option<&CardId> {
        self.previous_card_id.as_ref()
    }

    /// The canonical content snapshot bytes.
    pub fn content_snapshot(&self) -> &[u8] {
        &self.content_snapshot
    }

    /// Parse the content snapshot into its typed form.
    pub fn content(&self) -> Result<RawCardContent, CoreError> {
        RawCardContent::from_snapshot(&self.content_snapshot)
    }

    /// Signatures in signing order.
    pub fn signatures(&self) -> &[CardSignature] {
        &self.signatures
    }

    /// Find the signature of a given signer.
    pub fn signature_of(&self, signer: &str) -> Option<&CardSignature> {
        self.signatures.iter().find(|s| s.signer == signer)
    }

    /// Iterate the signer ids present on this card.
    pub fn signers(&self) -> impl Iterator<Item = &str> {
        self.signatures.iter().map(|s| s.signer.as_str())
    }

    /// The bytes a given signature was produced over.
    pub fn signed_payload(&self, signature: &CardSignature) -> Vec<u8> {
        signed_payload(&self.content_snapshot, signature.snapshot.as_deref())
    }

    /// Whether a newer card observed in the same search supersedes this one.
    pub fn is_outdated(&self) -> bool {
        self.is_outdated
    }

    pub fn mark_outdated(&mut self) {
        self.is_outdated = true;
    }

    /// The card this one supersedes, when it was present in the same search.
    pub fn previous_card(&self) -> Option<&Card> {
        self.previous_card.as_deref()
    }

    pub fn set_previous_card(&mut self, previous: Card) {
        self.previous_card = Some(Box::new(previous));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Ed25519Crypto, PrivateKey};
    use crate::snapshot::{content_snapshot, CARD_VERSION};

    fn model_for(identity: &str, previous: Option<&CardId>) -> (RawSignedModel, PrivateKey) {
        let key = PrivateKey::from_seed(&[0x42; 32]);
        let snapshot = content_snapshot(
            identity,
            key.public_key().as_bytes(),
            CARD_VERSION,
            1_700_000_000,
            previous,
        )
        .unwrap();
        (RawSignedModel::new(snapshot), key)
    }

    #[test]
    fn test_card_fields_from_model() {
        let crypto = Ed25519Crypto::new();
        let prev = CardId::from_bytes([0x11; 32]);
        let (model, key) = model_for("alice", Some(&prev));

        let card = Card::from_signed_model(&crypto, &model).unwrap();
        assert_eq!(card.identity(), "alice");
        assert_eq!(card.public_key(), &key.public_key());
        assert_eq!(card.version(), "5.0");
        assert_eq!(card.created_at(), 1_700_000_000);
        assert_eq!(card.previous_card_id(), Some(&prev));
        assert_eq!(card.id(), &CardId::derive(&crypto, &model.content_snapshot));
        assert!(!card.is_outdated());
        assert!(card.previous_card().is_none());
    }

    #[test]
    fn test_card_to_raw_model_roundtrip() {
        let crypto = Ed25519Crypto::new();
        let (mut model, _) = model_for("bob", None);
        model.signatures.push(RawSignature {
            signer: "self".into(),
            signature: vec![9; 64],
            signature_snapshot: Some(br#"{"device":"phone"}"#.to_vec()),
        });

        let card = Card::from_signed_model(&crypto, &model).unwrap();
        assert_eq!(card.to_raw_model(), model);

        let sig = card.signature_of("self").unwrap();
        let extra = sig.extra_fields.as_ref().unwrap();
        assert_eq!(extra.get("device").unwrap(), "phone");
    }

    #[test]
    fn test_non_object_signature_snapshot_has_no_extra_fields() {
        let raw = RawSignature {
            signer: "x".into(),
            signature: vec![],
            signature_snapshot: Some(b"opaque".to_vec()),
        };
        assert!(CardSignature::from_raw(&raw).extra_fields.is_none());
    }

    #[test]
    fn test_check_id_mismatch() {
        let crypto = Ed25519Crypto::new();
        let (model, _) = model_for("carol", None);
        let card = Card::from_signed_model(&crypto, &model).unwrap();

        assert!(card.check_id(&crypto, card.id()).is_ok());
        let wrong = CardId::from_bytes([0; 32]);
        assert!(matches!(
            card.check_id(&crypto, &wrong),
            Err(VerificationError::IdMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_public_key_rejected() {
        let crypto = Ed25519Crypto::new();
        let snapshot =
            content_snapshot("dave", &[0u8; 5], CARD_VERSION, 1, None).unwrap();
        let result = Card::from_signed_model(&crypto, &RawSignedModel::new(snapshot));
        assert!(matches!(result, Err(CoreError::InvalidPublicKey)));
    }

    #[test]
    fn test_duplicate_signer_rejected() {
        let crypto = Ed25519Crypto::new();
        let (mut model, _) = model_for("frank", None);
        for signature in [vec![1; 64], vec![0; 64]] {
            model.signatures.push(RawSignature {
                signer: "self".into(),
                signature,
                signature_snapshot: None,
            });
        }

        let result = Card::from_signed_model(&crypto, &model);
        assert!(matches!(result, Err(CoreError::MalformedModel(_))));

        model.signatures[1].signer = "virgil".into();
        assert!(Card::from_signed_model(&crypto, &model).is_ok());
    }

    #[test]
    fn test_outdated_and_previous_card() {
        let crypto = Ed25519Crypto::new();
        let (old_model, _) = model_for("erin", None);
        let mut old = Card::from_signed_model(&crypto, &old_model).unwrap();
        let (new_model, _) = model_for("erin", Some(old.id()));
        let mut new = Card::from_signed_model(&crypto, &new_model).unwrap();

        old.mark_outdated();
        new.set_previous_card(old.clone());

        assert!(new.previous_card().unwrap().is_outdated());
        assert_eq!(new.previous_card().unwrap().id(), old.id());
    }
}
