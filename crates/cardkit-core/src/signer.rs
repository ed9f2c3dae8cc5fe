//! Model signer: appends named signatures to a raw signed model.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::crypto::{CardCrypto, PrivateKey};
use crate::error::ValidationError;
use crate::model::{RawSignature, RawSignedModel};
use crate::snapshot::signed_payload;

/// Signer id of the card owner.
pub const SELF_SIGNER: &str = "self";

/// Signer id of the directory service.
pub const SERVICE_SIGNER: &str = "virgil";

/// Parameters for one signature.
pub struct SignParams<'a> {
    signer: String,
    private_key: &'a PrivateKey,
    signature_snapshot: Option<Vec<u8>>,
    extra_fields: Option<Map<String, Value>>,
}

impl<'a> SignParams<'a> {
    /// Sign as an arbitrary signer id.
    pub fn new(signer: impl Into<String>, private_key: &'a PrivateKey) -> Self {
        Self {
            signer: signer.into(),
            private_key,
            signature_snapshot: None,
            extra_fields: None,
        }
    }

    /// Sign as the card owner.
    pub fn self_signed(private_key: &'a PrivateKey) -> Self {
        Self::new(SELF_SIGNER, private_key)
    }

    /// Attach explicit extra signed bytes.
    pub fn snapshot(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.signature_snapshot = Some(bytes.into());
        self
    }

    /// Attach structured extra data. Ignored when an explicit snapshot is set.
    pub fn extra_fields(mut self, fields: Map<String, Value>) -> Self {
        self.extra_fields = Some(fields);
        self
    }
}

/// Produces signatures over a model's content snapshot.
#[derive(Clone)]
pub struct ModelSigner {
    crypto: Arc<dyn CardCrypto>,
}

impl ModelSigner {
    pub fn new(crypto: Arc<dyn CardCrypto>) -> Self {
        Self { crypto }
    }

    /// Sign the model and append the signature.
    ///
    /// Fails with [`ValidationError::DuplicateSignature`] if the signer id is
    /// already present; the model is left untouched in that case.
    pub fn sign(
        &self,
        model: &mut RawSignedModel,
        params: SignParams<'_>,
    ) -> Result<(), ValidationError> {
        if params.signer.is_empty() {
            return Err(ValidationError::EmptySigner);
        }
        if model.has_signer(&params.signer) {
            return Err(ValidationError::DuplicateSignature {
                signer: params.signer,
            });
        }

        let signature_snapshot = match (params.signature_snapshot, params.extra_fields) {
            (Some(snapshot), _) => Some(snapshot),
            (None, Some(fields)) => Some(
                serde_json::to_vec(&fields).map_err(|e| ValidationError::Malformed(e.to_string()))?,
            ),
            (None, None) => None,
        };

        let payload = signed_payload(&model.content_snapshot, signature_snapshot.as_deref());
        let signature = self
            .crypto
            .generate_signature(&payload, params.private_key)
            .map_err(|e| ValidationError::SigningFailed(e.to_string()))?;

        model.signatures.push(RawSignature {
            signer: params.signer,
            signature,
            signature_snapshot,
        });
        Ok(())
    }

    /// Sign as `"self"`.
    pub fn self_sign(
        &self,
        model: &mut RawSignedModel,
        private_key: &PrivateKey,
        signature_snapshot: Option<Vec<u8>>,
        extra_fields: Option<Map<String, Value>>,
    ) -> Result<(), ValidationError> {
        let mut params = SignParams::self_signed(private_key);
        if let Some(snapshot) = signature_snapshot {
            params = params.snapshot(snapshot);
        }
        if let Some(fields) = extra_fields {
            params = params.extra_fields(fields);
        }
        self.sign(model, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Ed25519Crypto;
    use serde_json::json;

    fn signer() -> ModelSigner {
        ModelSigner::new(Arc::new(Ed25519Crypto::new()))
    }

    fn model() -> RawSignedModel {
        RawSignedModel::new(br#"{"identity":"alice"}"#.to_vec())
    }

    #[test]
    fn test_self_sign_appends_verifiable_signature() {
        let crypto = Ed25519Crypto::new();
        let key = PrivateKey::from_seed(&[0x42; 32]);
        let mut model = model();

        signer().self_sign(&mut model, &key, None, None).unwrap();

        assert_eq!(model.signatures.len(), 1);
        let sig = &model.signatures[0];
        assert_eq!(sig.signer, SELF_SIGNER);
        assert!(sig.signature_snapshot.is_none());
        assert!(crypto.verify_signature(&model.content_snapshot, &sig.signature, &key.public_key()));
    }

    #[test]
    fn test_duplicate_signer_rejected() {
        let k1 = PrivateKey::from_seed(&[0x01; 32]);
        let k2 = PrivateKey::from_seed(&[0x02; 32]);
        let mut model = model();

        signer().sign(&mut model, SignParams::new("self", &k1)).unwrap();
        let result = signer().sign(&mut model, SignParams::new("self", &k2));
        assert!(matches!(
            result,
            Err(ValidationError::DuplicateSignature { ref signer }) if signer == "self"
        ));
        assert_eq!(model.signatures.len(), 1);

        signer().sign(&mut model, SignParams::new("endorser", &k2)).unwrap();
        assert_eq!(model.signatures.len(), 2);
    }

    #[test]
    fn test_empty_signer_rejected() {
        let key = PrivateKey::generate();
        let result = signer().sign(&mut model(), SignParams::new("", &key));
        assert!(matches!(result, Err(ValidationError::EmptySigner)));
    }

    #[test]
    fn test_signature_snapshot_is_appended_before_signing() {
        let crypto = Ed25519Crypto::new();
        let key = PrivateKey::generate();
        let mut model = model();

        signer()
            .sign(&mut model, SignParams::new("extra", &key).snapshot(b"meta".to_vec()))
            .unwrap();

        let sig = &model.signatures[0];
        assert_eq!(sig.signature_snapshot.as_deref(), Some(&b"meta"[..]));

        let mut payload = model.content_snapshot.clone();
        payload.extend_from_slice(b"meta");
        assert!(crypto.verify_signature(&payload, &sig.signature, &key.public_key()));
        assert!(!crypto.verify_signature(&model.content_snapshot, &sig.signature, &key.public_key()));
    }

    #[test]
    fn test_extra_fields_become_compact_json_snapshot() {
        let key = PrivateKey::generate();
        let mut model = model();
        let fields = json!({"os": "linux", "app": "cli"});
        let fields = fields.as_object().unwrap().clone();

        signer().self_sign(&mut model, &key, None, Some(fields)).unwrap();

        assert_eq!(
            model.signatures[0].signature_snapshot.as_deref(),
            Some(&br#"{"app":"cli","os":"linux"}"#[..])
        );
    }

    #[test]
    fn test_explicit_snapshot_wins_over_extra_fields() {
        let key = PrivateKey::generate();
        let mut model = model();
        let fields = json!({"ignored": true}).as_object().unwrap().clone();

        signer()
            .self_sign(&mut model, &key, Some(b"explicit".to_vec()), Some(fields))
            .unwrap();

        assert_eq!(
            model.signatures[0].signature_snapshot.as_deref(),
            Some(&b"explicit"[..])
        );
    }
}
