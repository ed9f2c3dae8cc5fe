//! In-memory card directory.
//!
//! A full directory service without the network: it checks bearer tokens,
//! requires a valid self signature, counter-signs accepted cards with its own
//! service key, and remembers which cards were superseded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use cardkit_auth::{Jwt, JwtVerifier};
use cardkit_core::{
    Card, CardCrypto, CardId, ModelSigner, PrivateKey, PublicKey, RawSignedModel,
    ServiceTrustAnchor, SignParams, SELF_SIGNER, SERVICE_SIGNER,
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::transport::CardTransport;

/// In-memory directory implementation.
///
/// All data is lost when the directory is dropped.
pub struct MemoryDirectory {
    crypto: Arc<dyn CardCrypto>,
    signer: ModelSigner,
    service_key: PrivateKey,
    token_verifier: JwtVerifier,
    inner: RwLock<DirectoryInner>,
}

#[derive(Default)]
struct DirectoryInner {
    /// Stored models indexed by id.
    cards: HashMap<CardId, RawSignedModel>,

    /// Publication order, for stable search results.
    order: Vec<CardId>,

    /// Identity of each stored card.
    identities: HashMap<CardId, String>,

    /// Cards a later publication named as its predecessor.
    superseded: HashSet<CardId>,
}

impl MemoryDirectory {
    pub fn new(
        crypto: Arc<dyn CardCrypto>,
        service_key: PrivateKey,
        token_verifier: JwtVerifier,
    ) -> Self {
        Self {
            signer: ModelSigner::new(Arc::clone(&crypto)),
            crypto,
            service_key,
            token_verifier,
            inner: RwLock::new(DirectoryInner::default()),
        }
    }

    /// Public half of the key the directory counter-signs with.
    pub fn service_public_key(&self) -> PublicKey {
        self.service_key.public_key()
    }

    /// Trust anchor clients should configure for this directory.
    pub fn trust_anchor(&self) -> ServiceTrustAnchor {
        ServiceTrustAnchor::new(self.service_public_key())
    }

    /// Number of stored cards.
    pub async fn len(&self) -> usize {
        self.inner.read().await.cards.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn authorize(&self, token: &str) -> Result<Jwt> {
        let jwt: Jwt = token
            .parse()
            .map_err(|e| TransportError::Unauthorized(format!("{}", e)))?;
        if !self.token_verifier.verify_token(&jwt) {
            return Err(TransportError::Unauthorized("invalid token".into()));
        }
        if jwt.is_expired() {
            return Err(TransportError::Unauthorized("token expired".into()));
        }
        Ok(jwt)
    }

    fn check_self_signature(&self, card: &Card) -> Result<()> {
        let signature = card
            .signature_of(SELF_SIGNER)
            .ok_or_else(|| TransportError::BadRequest("missing self signature".into()))?;
        let payload = card.signed_payload(signature);
        if !self
            .crypto
            .verify_signature(&payload, &signature.signature, card.public_key())
        {
            return Err(TransportError::BadRequest("invalid self signature".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CardTransport for MemoryDirectory {
    async fn publish_card(&self, model: &RawSignedModel, token: &str) -> Result<RawSignedModel> {
        self.authorize(token)?;

        let card = Card::from_signed_model(self.crypto.as_ref(), model)
            .map_err(|e| TransportError::BadRequest(e.to_string()))?;
        self.check_self_signature(&card)?;
        if model.has_signer(SERVICE_SIGNER) {
            return Err(TransportError::BadRequest(
                "service signature must not be supplied by the client".into(),
            ));
        }

        let mut inner = self.inner.write().await;
        let card_id = *card.id();
        if inner.cards.contains_key(&card_id) {
            return Err(TransportError::Conflict(format!("card {} already exists", card_id)));
        }

        if let Some(previous) = card.previous_card_id() {
            match inner.identities.get(previous) {
                Some(identity) if identity == card.identity() => {}
                Some(_) => {
                    warn!(card_id = %card_id, previous = %previous, "predecessor has another identity");
                    return Err(TransportError::BadRequest(
                        "previous card belongs to another identity".into(),
                    ));
                }
                None => {
                    return Err(TransportError::BadRequest(format!(
                        "previous card {} not found",
                        previous
                    )));
                }
            }
        }

        let mut stored = model.clone();
        self.signer
            .sign(&mut stored, SignParams::new(SERVICE_SIGNER, &self.service_key))
            .map_err(|e| TransportError::BadRequest(e.to_string()))?;

        if let Some(previous) = card.previous_card_id() {
            inner.superseded.insert(*previous);
        }
        inner.identities.insert(card_id, card.identity().to_string());
        inner.order.push(card_id);
        inner.cards.insert(card_id, stored.clone());

        debug!(card_id = %card_id, identity = card.identity(), "card published");
        Ok(stored)
    }

    async fn get_card(&self, card_id: &CardId, token: &str) -> Result<(RawSignedModel, bool)> {
        self.authorize(token)?;

        let inner = self.inner.read().await;
        let model = inner
            .cards
            .get(card_id)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(format!("card {}", card_id)))?;
        Ok((model, inner.superseded.contains(card_id)))
    }

    async fn search_cards(
        &self,
        identities: &[String],
        token: &str,
    ) -> Result<Vec<RawSignedModel>> {
        self.authorize(token)?;
        if identities.is_empty() {
            return Err(TransportError::BadRequest("no identities given".into()));
        }

        let wanted: HashSet<&str> = identities.iter().map(String::as_str).collect();
        let inner = self.inner.read().await;
        let found: Vec<RawSignedModel> = inner
            .order
            .iter()
            .filter(|id| {
                inner
                    .identities
                    .get(*id)
                    .is_some_and(|identity| wanted.contains(identity.as_str()))
            })
            .filter_map(|id| inner.cards.get(id).cloned())
            .collect();

        debug!(identities = identities.len(), found = found.len(), "search served");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardkit_auth::{Ed25519TokenSigner, JwtGenerator};
    use cardkit_core::{content_snapshot, Ed25519Crypto};
    use std::time::Duration;

    struct Setup {
        directory: MemoryDirectory,
        generator: JwtGenerator,
        signer: ModelSigner,
    }

    fn setup() -> Setup {
        let crypto: Arc<dyn CardCrypto> = Arc::new(Ed25519Crypto::new());
        let token_signer = Arc::new(Ed25519TokenSigner::new(Arc::clone(&crypto)));
        let api_key = PrivateKey::from_seed(&[0xA1; 32]);
        let verifier = JwtVerifier::new(api_key.public_key(), "api", token_signer.clone());
        let generator =
            JwtGenerator::new("app", api_key, "api", Duration::from_secs(600), token_signer);
        Setup {
            directory: MemoryDirectory::new(
                Arc::clone(&crypto),
                PrivateKey::from_seed(&[0xB2; 32]),
                verifier,
            ),
            generator,
            signer: ModelSigner::new(crypto),
        }
    }

    impl Setup {
        fn token(&self) -> String {
            self.generator
                .generate_token("alice", None)
                .unwrap()
                .to_string()
        }

        fn card(&self, key: &PrivateKey, identity: &str, previous: Option<&CardId>) -> RawSignedModel {
            let snapshot = content_snapshot(
                identity,
                key.public_key().as_bytes(),
                "5.0",
                1_700_000_000,
                previous,
            )
            .unwrap();
            let mut model = RawSignedModel::new(snapshot);
            self.signer.self_sign(&mut model, key, None, None).unwrap();
            model
        }
    }

    fn id_of(model: &RawSignedModel) -> CardId {
        CardId::derive(&Ed25519Crypto::new(), &model.content_snapshot)
    }

    #[tokio::test]
    async fn test_publish_adds_service_signature() {
        let s = setup();
        let key = PrivateKey::generate();
        let model = s.card(&key, "alice", None);

        let stored = s.directory.publish_card(&model, &s.token()).await.unwrap();
        assert_eq!(stored.content_snapshot, model.content_snapshot);
        assert_eq!(stored.signatures.len(), 2);

        let service = stored.signature_of(SERVICE_SIGNER).unwrap();
        assert!(Ed25519Crypto::new().verify_signature(
            &stored.content_snapshot,
            &service.signature,
            &s.directory.service_public_key()
        ));
    }

    #[tokio::test]
    async fn test_rejects_bad_tokens() {
        let s = setup();
        let model = s.card(&PrivateKey::generate(), "alice", None);

        let result = s.directory.publish_card(&model, "not.a.token").await;
        assert!(matches!(result, Err(TransportError::Unauthorized(_))));

        let expired = s
            .generator
            .generate_token_at("alice", None, 1_000)
            .unwrap()
            .to_string();
        let result = s.directory.publish_card(&model, &expired).await;
        assert!(matches!(result, Err(TransportError::Unauthorized(_))));
        assert!(s.directory.is_empty().await);
    }

    #[tokio::test]
    async fn test_rejects_duplicate_and_unsigned() {
        let s = setup();
        let key = PrivateKey::generate();
        let model = s.card(&key, "alice", None);
        s.directory.publish_card(&model, &s.token()).await.unwrap();

        let again = s.directory.publish_card(&model, &s.token()).await;
        assert!(matches!(again, Err(TransportError::Conflict(_))));

        let unsigned = RawSignedModel::new(s.card(&key, "bob", None).content_snapshot);
        let result = s.directory.publish_card(&unsigned, &s.token()).await;
        assert!(matches!(result, Err(TransportError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_supersession_hint_and_search() {
        let s = setup();
        let first = s.card(&PrivateKey::generate(), "alice", None);
        let first_id = id_of(&first);
        s.directory.publish_card(&first, &s.token()).await.unwrap();

        let second = s.card(&PrivateKey::generate(), "alice", Some(&first_id));
        let second_id = id_of(&second);
        s.directory.publish_card(&second, &s.token()).await.unwrap();

        s.directory
            .publish_card(&s.card(&PrivateKey::generate(), "bob", None), &s.token())
            .await
            .unwrap();

        let (_, outdated) = s.directory.get_card(&first_id, &s.token()).await.unwrap();
        assert!(outdated);
        let (_, outdated) = s.directory.get_card(&second_id, &s.token()).await.unwrap();
        assert!(!outdated);

        let found = s
            .directory
            .search_cards(&["alice".to_string()], &s.token())
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(id_of(&found[0]), first_id);
        assert_eq!(id_of(&found[1]), second_id);
    }

    #[tokio::test]
    async fn test_previous_card_must_share_identity() {
        let s = setup();
        let bob = s.card(&PrivateKey::generate(), "bob", None);
        let bob_id = id_of(&bob);
        s.directory.publish_card(&bob, &s.token()).await.unwrap();

        let alice = s.card(&PrivateKey::generate(), "alice", Some(&bob_id));
        let result = s.directory.publish_card(&alice, &s.token()).await;
        assert!(matches!(result, Err(TransportError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_get_unknown_card() {
        let s = setup();
        let result = s.directory.get_card(&CardId::from_bytes([0; 32]), &s.token()).await;
        assert!(matches!(result, Err(TransportError::NotFound(_))));
    }
}
