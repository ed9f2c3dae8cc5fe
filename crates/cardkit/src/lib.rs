//! # cardkit
//!
//! Trusted identity cards over an untrusted directory.
//!
//! ## Overview
//!
//! A card binds an identity string to a public key. It is self-signed by its
//! owner, counter-signed by the directory, and optionally endorsed by other
//! parties. Every card the [`CardManager`] hands out has been re-verified
//! locally:
//!
//! - the id is recomputed from the content snapshot
//! - the trust policy ([`TrustPolicyVerifier`]) accepts its signatures
//! - search results contain only requested identities
//! - superseded cards are folded into their successor
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cardkit::auth::{CachingTokenProvider, Ed25519TokenSigner, GeneratorTokenProvider, JwtGenerator, JwtVerifier};
//! use cardkit::transport::MemoryDirectory;
//! use cardkit::{CardCrypto, CardManager, Ed25519Crypto, ManagerConfig, PrivateKey, TrustPolicyVerifier};
//!
//! async fn example() -> cardkit::Result<()> {
//!     let crypto: Arc<dyn CardCrypto> = Arc::new(Ed25519Crypto::new());
//!     let token_signer = Arc::new(Ed25519TokenSigner::new(crypto.clone()));
//!
//!     let api_key = PrivateKey::generate();
//!     let token_verifier = JwtVerifier::new(api_key.public_key(), "api-key-id", token_signer.clone());
//!     let generator = JwtGenerator::new("app-id", api_key, "api-key-id", Duration::from_secs(600), token_signer);
//!
//!     let directory = Arc::new(MemoryDirectory::new(crypto.clone(), PrivateKey::generate(), token_verifier));
//!     let verifier = TrustPolicyVerifier::new(crypto.clone(), directory.trust_anchor());
//!     let tokens = CachingTokenProvider::new(GeneratorTokenProvider::new(generator, "alice"));
//!
//!     let manager = CardManager::new(
//!         crypto,
//!         Arc::new(verifier),
//!         Arc::new(tokens),
//!         directory,
//!         ManagerConfig::default(),
//!     );
//!
//!     let key = PrivateKey::generate();
//!     let card = manager.publish_card(&key, &key.public_key(), "alice", None, None).await?;
//!     let found = manager.search_card("alice").await?;
//!     assert_eq!(found[0].id(), card.id());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `cardkit::core` - Card primitives, signer and verifier
//! - `cardkit::auth` - Tokens and token providers
//! - `cardkit::transport` - Directory port and in-memory directory

pub mod error;
pub mod manager;
pub mod source;

// Re-export component crates
pub use cardkit_auth as auth;
pub use cardkit_core as core;
pub use cardkit_transport as transport;

// Re-export main types for convenience
pub use error::{ManagerError, Result};
pub use manager::{resolve_supersession, CardManager, CoSigner, ManagerConfig};
pub use source::CardSource;

// Re-export commonly used core types
pub use cardkit_core::{
    Card, CardCrypto, CardId, CardSignature, CardVerifier, Ed25519Crypto, PrivateKey, PublicKey,
    RawSignedModel, ServiceTrustAnchor, TrustPolicyVerifier, VerifierConfig, VerifierCredentials,
    WhiteList,
};
