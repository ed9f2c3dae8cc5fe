//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: an in-memory directory, a token
//! issuer it trusts, and managers wired to both.

use std::sync::Arc;
use std::time::Duration;

use cardkit::{CardManager, ManagerConfig};
use cardkit_auth::{
    CachingTokenProvider, Ed25519TokenSigner, GeneratorTokenProvider, JwtGenerator, JwtVerifier,
    TokenProvider,
};
use cardkit_core::{
    content_snapshot, CardCrypto, CardId, CardVerifier, Ed25519Crypto, ModelSigner, PrivateKey,
    RawSignedModel, ServiceTrustAnchor, TrustPolicyVerifier, CARD_VERSION,
};
use cardkit_transport::MemoryDirectory;

/// Application id tokens are issued for.
pub const APP_ID: &str = "test-app";

/// Key id of the token issuing key.
pub const API_KEY_ID: &str = "test-api-key";

/// Seed of the directory's service key.
pub const SERVICE_SEED: [u8; 32] = [0x5E; 32];

/// A directory with its token issuer.
pub struct TestFixture {
    pub crypto: Arc<dyn CardCrypto>,
    pub generator: JwtGenerator,
    pub directory: Arc<MemoryDirectory>,
}

impl TestFixture {
    /// Fixture issuing ten-minute tokens.
    pub fn new() -> Self {
        Self::with_token_lifetime(Duration::from_secs(600))
    }

    /// Fixture with a custom token lifetime.
    pub fn with_token_lifetime(lifetime: Duration) -> Self {
        let crypto: Arc<dyn CardCrypto> = Arc::new(Ed25519Crypto::new());
        let token_signer = Arc::new(Ed25519TokenSigner::new(Arc::clone(&crypto)));

        let api_key = PrivateKey::from_seed(&[0xA0; 32]);
        let token_verifier =
            JwtVerifier::new(api_key.public_key(), API_KEY_ID, token_signer.clone());
        let generator = JwtGenerator::new(APP_ID, api_key, API_KEY_ID, lifetime, token_signer);

        let directory = Arc::new(MemoryDirectory::new(
            Arc::clone(&crypto),
            PrivateKey::from_seed(&SERVICE_SEED),
            token_verifier,
        ));

        Self {
            crypto,
            generator,
            directory,
        }
    }

    /// Deterministic key for party `n`.
    pub fn key(&self, n: u8) -> PrivateKey {
        PrivateKey::from_seed(&[n; 32])
    }

    /// The key the directory counter-signs with.
    pub fn service_key(&self) -> PrivateKey {
        PrivateKey::from_seed(&SERVICE_SEED)
    }

    pub fn trust_anchor(&self) -> ServiceTrustAnchor {
        self.directory.trust_anchor()
    }

    /// Default policy: self and service signatures required.
    pub fn verifier(&self) -> TrustPolicyVerifier {
        TrustPolicyVerifier::new(Arc::clone(&self.crypto), self.trust_anchor())
    }

    /// A fresh token string for `identity`.
    pub fn token(&self, identity: &str) -> String {
        self.generator
            .generate_token(identity, None)
            .expect("fixture token")
            .to_string()
    }

    pub fn token_provider(&self, identity: &str) -> CachingTokenProvider<GeneratorTokenProvider> {
        CachingTokenProvider::new(GeneratorTokenProvider::new(
            self.generator.clone(),
            identity,
        ))
    }

    /// Manager with the default policy and a caching token provider.
    pub fn manager(&self, identity: &str) -> CardManager<MemoryDirectory> {
        self.manager_with(
            Arc::new(self.verifier()),
            Arc::new(self.token_provider(identity)),
            ManagerConfig::default(),
        )
    }

    pub fn manager_with(
        &self,
        verifier: Arc<dyn CardVerifier>,
        tokens: Arc<dyn TokenProvider>,
        config: ManagerConfig,
    ) -> CardManager<MemoryDirectory> {
        CardManager::new(
            Arc::clone(&self.crypto),
            verifier,
            tokens,
            Arc::clone(&self.directory),
            config,
        )
    }

    pub fn signer(&self) -> ModelSigner {
        ModelSigner::new(Arc::clone(&self.crypto))
    }

    /// A self-signed model with a fixed timestamp.
    pub fn make_raw_card(
        &self,
        key: &PrivateKey,
        identity: &str,
        created_at: i64,
        previous_card_id: Option<&CardId>,
    ) -> RawSignedModel {
        let snapshot = content_snapshot(
            identity,
            key.public_key().as_bytes(),
            CARD_VERSION,
            created_at,
            previous_card_id,
        )
        .expect("snapshot of fixture card");
        let mut model = RawSignedModel::new(snapshot);
        self.signer()
            .self_sign(&mut model, key, None, None)
            .expect("fresh model has no signers");
        model
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct deterministic keys for multi-party tests.
pub fn multi_party_keys(count: usize) -> Vec<PrivateKey> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = 0xC0;
            PrivateKey::from_seed(&seed)
        })
        .collect()
}
