//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the exact content snapshot bytes, the card id and the
//! (deterministic Ed25519) self signature, so every implementation can check
//! it produces the same cards.

use std::sync::Arc;

use cardkit_core::{
    content_snapshot, CardId, Ed25519Crypto, ModelSigner, PrivateKey, RawSignedModel,
    CARD_VERSION,
};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed of the card owner's key.
    pub seed: [u8; 32],
    pub identity: &'static str,
    /// Unix seconds.
    pub created_at: i64,
    /// Predecessor id (hex).
    pub previous_card_id: Option<&'static str>,
    /// Expected content snapshot (UTF-8 JSON).
    pub expected_snapshot: &'static str,
    /// Expected card id (hex).
    pub expected_card_id: &'static str,
    /// Expected self signature (hex).
    pub expected_self_signature: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "first card for alice",
            seed: [0x42; 32],
            identity: "alice",
            created_at: 1_700_000_000,
            previous_card_id: None,
            expected_snapshot: r#"{"created_at":1700000000,"identity":"alice","public_key":"IVL40Zt5HSRFMkLhXy6rbLfP+ntqXtMAl5YOBpiB2xI=","version":"5.0"}"#,
            expected_card_id: "74479ecf08c05ae376d3152d3cd355248dd28def8ad4bddedfc86214599bbe6b",
            expected_self_signature: "f2942176678a8eeb9bde8dab4c0cd8f0b2a2cc494f0ce5987857831cab351667a79516f326c7b7995ed689cba91f3e0604fb2d509877a007031d4d12af977a07",
        },
        GoldenVector {
            name: "zero seed and epoch timestamp",
            seed: [0x00; 32],
            identity: "bob@example.com",
            created_at: 0,
            previous_card_id: None,
            expected_snapshot: r#"{"created_at":0,"identity":"bob@example.com","public_key":"O2onvM62pC1io6jQKm8Nc2UyFXcd4kOmOsBIoYtZ2ik=","version":"5.0"}"#,
            expected_card_id: "b6b58e23e91f6f50fbadf447768ccfbe1984718875153f0ac74dc6234cda71c3",
            expected_self_signature: "b0ef73b59e322f7a61ea72ba93ce978158bcaddf8e1d4407299923ec2be3cc863d07b3fdc68ff2d9f5f91aa49dbc5ec3588ce4dd50455c2b137f5ed36a1b3b06",
        },
        GoldenVector {
            name: "rotated card for alice",
            seed: [0x43; 32],
            identity: "alice",
            created_at: 1_700_000_100,
            previous_card_id: Some(
                "74479ecf08c05ae376d3152d3cd355248dd28def8ad4bddedfc86214599bbe6b",
            ),
            expected_snapshot: r#"{"created_at":1700000100,"identity":"alice","previous_card_id":"74479ecf08c05ae376d3152d3cd355248dd28def8ad4bddedfc86214599bbe6b","public_key":"Ivwpd5Lwtv/Av8/bftsMCqFOAlo2XsDjQuhuOCnLdLY=","version":"5.0"}"#,
            expected_card_id: "47a5f6bfcbba4f23cd7cc966a61e52c5e6ffdc82777c889a312e85c84ce79d3f",
            expected_self_signature: "96ff4abec55139f7f4efd0a3578ecc9a454d64b41cbb44c80aa7e64b619b279dfe4ced1a443a386688ccaeaaaa81c1fd09fa3179879539c09b6bf321b5880f06",
        },
    ]
}

/// Build the self-signed model described by a vector.
pub fn model_from_vector(vector: &GoldenVector) -> RawSignedModel {
    let key = PrivateKey::from_seed(&vector.seed);
    let previous = vector
        .previous_card_id
        .map(|hex| CardId::from_hex(hex).expect("vector previous id is hex"));

    let snapshot = content_snapshot(
        vector.identity,
        key.public_key().as_bytes(),
        CARD_VERSION,
        vector.created_at,
        previous.as_ref(),
    )
    .expect("snapshot of vector card");

    let mut model = RawSignedModel::new(snapshot);
    ModelSigner::new(Arc::new(Ed25519Crypto::new()))
        .self_sign(&mut model, &key, None, None)
        .expect("fresh model has no signers");
    model
}

/// Check every vector. Returns (name, matches, computed card id).
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let crypto = Ed25519Crypto::new();
    all_vectors()
        .iter()
        .map(|v| {
            let model = model_from_vector(v);
            let id = CardId::derive(&crypto, &model.content_snapshot).to_hex();
            let signature = hex::encode(&model.signatures[0].signature);

            let matches = model.content_snapshot == v.expected_snapshot.as_bytes()
                && id == v.expected_card_id
                && signature == v.expected_self_signature;

            (v.name.to_string(), matches, id)
        })
        .collect()
}
