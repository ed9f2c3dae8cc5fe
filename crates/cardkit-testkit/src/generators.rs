//! Proptest generators for property-based testing.

use proptest::prelude::*;
use std::sync::Arc;

use cardkit_core::{
    content_snapshot, CardId, Ed25519Crypto, ModelSigner, PrivateKey, PublicKey, RawSignedModel,
    CARD_VERSION,
};

/// Generate a random private key.
pub fn private_key() -> impl Strategy<Value = PrivateKey> {
    any::<[u8; 32]>().prop_map(|seed| PrivateKey::from_seed(&seed))
}

/// Generate a random PublicKey.
pub fn public_key() -> impl Strategy<Value = PublicKey> {
    private_key().prop_map(|key| key.public_key())
}

/// Generate a random CardId.
pub fn card_id() -> impl Strategy<Value = CardId> {
    any::<[u8; 32]>().prop_map(CardId::from_bytes)
}

/// Generate a reasonable creation time (Unix seconds).
pub fn created_at() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800i64
}

/// Generate an identity, including characters JSON must escape.
pub fn identity() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9._@-]{0,31}".prop_map(String::from),
        "[a-z\"\\\\/ ]{1,16}".prop_map(String::from),
    ]
}

/// Parameters for generating a card.
#[derive(Debug, Clone)]
pub struct CardParams {
    pub key: PrivateKey,
    pub identity: String,
    pub created_at: i64,
    pub previous_card_id: Option<CardId>,
}

impl Arbitrary for CardParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(), // seed
            identity(),
            created_at(),
            any::<Option<[u8; 32]>>(),
        )
            .prop_map(|(seed, identity, created_at, prev)| CardParams {
                key: PrivateKey::from_seed(&seed),
                identity,
                created_at,
                previous_card_id: prev.map(CardId::from_bytes),
            })
            .boxed()
    }
}

/// Content snapshot for parameters.
pub fn snapshot_from_params(params: &CardParams) -> Vec<u8> {
    content_snapshot(
        &params.identity,
        params.key.public_key().as_bytes(),
        CARD_VERSION,
        params.created_at,
        params.previous_card_id.as_ref(),
    )
    .expect("snapshot of generated card")
}

/// Self-signed model for parameters.
pub fn model_from_params(params: &CardParams) -> RawSignedModel {
    let mut model = RawSignedModel::new(snapshot_from_params(params));
    ModelSigner::new(Arc::new(Ed25519Crypto::new()))
        .self_sign(&mut model, &params.key, None, None)
        .expect("fresh model has no signers");
    model
}
