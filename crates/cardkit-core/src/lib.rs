//! # cardkit core
//!
//! Pure trust primitives for Cards: identity strings bound to public keys,
//! carried with detached multi-signatures.
//!
//! This crate contains no I/O and no networking. It is pure computation over
//! signed data structures.
//!
//! ## Key Types
//!
//! - [`Card`] - A verified-shape card rebuilt from its wire model
//! - [`CardId`] - Content-derived identifier (SHA-512 prefix of the snapshot)
//! - [`RawSignedModel`] - The wire form: content snapshot plus signatures
//! - [`ModelSigner`] - Appends self, service, or extra signatures
//! - [`TrustPolicyVerifier`] - Evaluates signatures against a trust policy
//!
//! ## Content Snapshots
//!
//! All cards sign and hash the same canonical JSON. See [`snapshot`].

pub mod card;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod model;
pub mod signer;
pub mod snapshot;
pub mod types;
pub mod verifier;

pub use card::{Card, CardSignature};
pub use crypto::{CardCrypto, Ed25519Crypto, PrivateKey, PublicKey};
pub use error::{CoreError, ValidationError, VerificationError};
pub use model::{RawSignature, RawSignedModel};
pub use signer::{ModelSigner, SignParams, SELF_SIGNER, SERVICE_SIGNER};
pub use snapshot::{content_snapshot, signed_payload, RawCardContent, CARD_VERSION};
pub use types::CardId;
pub use verifier::{
    CardVerifier, ServiceTrustAnchor, TrustPolicyVerifier, VerifierConfig, VerifierCredentials,
    WhiteList,
};
