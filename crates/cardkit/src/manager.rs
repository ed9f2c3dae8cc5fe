//! The card manager: unified client API over the card directory.
//!
//! The manager builds and self-signs cards, hands them to an optional
//! co-signer, talks to the directory with a bearer token, and re-verifies
//! every card the directory returns before handing it out.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use cardkit_auth::{now_secs, TokenContext, TokenProvider};
use cardkit_core::{
    content_snapshot, Card, CardCrypto, CardId, CardVerifier, ModelSigner, PrivateKey, PublicKey,
    RawSignedModel, ValidationError, VerificationError, CARD_VERSION,
};
use cardkit_transport::CardTransport;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ManagerError, Result};
use crate::source::CardSource;

/// A remote party that adds its own signature before publication.
#[async_trait]
pub trait CoSigner: Send + Sync {
    async fn co_sign(&self, model: RawSignedModel) -> anyhow::Result<RawSignedModel>;
}

/// Configuration for the manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Retry a call once with a reloaded token when the directory reports
    /// the token as unauthorized.
    pub retry_on_unauthorized: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            retry_on_unauthorized: false,
        }
    }
}

/// The main manager struct.
pub struct CardManager<T: CardTransport> {
    crypto: Arc<dyn CardCrypto>,
    signer: ModelSigner,
    verifier: Arc<dyn CardVerifier>,
    token_provider: Arc<dyn TokenProvider>,
    transport: Arc<T>,
    co_signer: Option<Arc<dyn CoSigner>>,
    config: ManagerConfig,
}

impl<T: CardTransport> CardManager<T> {
    pub fn new(
        crypto: Arc<dyn CardCrypto>,
        verifier: Arc<dyn CardVerifier>,
        token_provider: Arc<dyn TokenProvider>,
        transport: Arc<T>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            signer: ModelSigner::new(Arc::clone(&crypto)),
            crypto,
            verifier,
            token_provider,
            transport,
            co_signer: None,
            config,
        }
    }

    /// Route every publication through a co-signer.
    pub fn with_co_signer(mut self, co_signer: Arc<dyn CoSigner>) -> Self {
        self.co_signer = Some(co_signer);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Building
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a self-signed model for a new card. Nothing is sent.
    pub fn generate_raw_card(
        &self,
        private_key: &PrivateKey,
        public_key: &PublicKey,
        identity: &str,
        previous_card_id: Option<&CardId>,
        extra_fields: Option<Map<String, Value>>,
    ) -> Result<RawSignedModel> {
        if identity.is_empty() {
            return Err(ValidationError::EmptyIdentity.into());
        }

        let exported = self.crypto.export_public_key(public_key);
        let snapshot = content_snapshot(
            identity,
            &exported,
            CARD_VERSION,
            now_secs(),
            previous_card_id,
        )
        .map_err(ValidationError::from)?;

        let mut model = RawSignedModel::new(snapshot);
        self.signer
            .self_sign(&mut model, private_key, None, extra_fields)?;
        Ok(model)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Directory Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Build, sign and publish a new card.
    pub async fn publish_card(
        &self,
        private_key: &PrivateKey,
        public_key: &PublicKey,
        identity: &str,
        previous_card_id: Option<&CardId>,
        extra_fields: Option<Map<String, Value>>,
    ) -> Result<Card> {
        let model =
            self.generate_raw_card(private_key, public_key, identity, previous_card_id, extra_fields)?;
        self.publish_raw_card(model).await
    }

    /// Publish a prepared model.
    ///
    /// The directory's answer must carry the exact snapshot that was sent and
    /// pass the full trust policy.
    pub async fn publish_raw_card(&self, model: RawSignedModel) -> Result<Card> {
        let card = Card::from_signed_model(self.crypto.as_ref(), &model)?;
        let card_id = *card.id();

        let model = match &self.co_signer {
            Some(co_signer) => {
                let signed = co_signer
                    .co_sign(model.clone())
                    .await
                    .map_err(ManagerError::CoSigner)?;
                if signed.content_snapshot != model.content_snapshot {
                    warn!(card_id = %card_id, "co-signer altered the content snapshot");
                    return Err(VerificationError::SnapshotMismatch { card_id }.into());
                }
                signed
            }
            None => model,
        };

        let context = TokenContext::new("publish").with_identity(card.identity());
        let transport = &self.transport;
        let sent = &model;
        let published = self
            .with_token(context, |token| async move {
                transport.publish_card(sent, &token).await
            })
            .await?;

        if published.content_snapshot != model.content_snapshot {
            warn!(card_id = %card_id, "directory returned a different content snapshot");
            return Err(VerificationError::SnapshotMismatch { card_id }.into());
        }

        let card = Card::from_signed_model(self.crypto.as_ref(), &published)?;
        card.check_id(self.crypto.as_ref(), &card_id)?;
        self.ensure_trusted(&card)?;

        debug!(card_id = %card_id, identity = card.identity(), "card published");
        Ok(card)
    }

    /// Fetch and verify one card.
    pub async fn get_card(&self, card_id: &CardId) -> Result<Card> {
        let transport = &self.transport;
        let (model, outdated) = self
            .with_token(TokenContext::new("get"), |token| async move {
                transport.get_card(card_id, &token).await
            })
            .await?;

        // The id is checked on the raw snapshot, before parsing or policy.
        let actual = CardId::derive(self.crypto.as_ref(), &model.content_snapshot);
        if &actual != card_id {
            warn!(card_id = %card_id, actual = %actual, "directory returned a card with another id");
            return Err(VerificationError::IdMismatch {
                expected: *card_id,
                actual,
            }
            .into());
        }

        let mut card = Card::from_signed_model(self.crypto.as_ref(), &model)?;
        self.ensure_trusted(&card)?;

        if outdated {
            card.mark_outdated();
        }
        debug!(card_id = %card_id, outdated, "card fetched");
        Ok(card)
    }

    /// Current cards of one identity.
    pub async fn search_card(&self, identity: &str) -> Result<Vec<Card>> {
        self.search_cards(&[identity.to_string()]).await
    }

    /// Current cards of several identities.
    ///
    /// Every returned card must belong to one of the identities and pass the
    /// trust policy; any other answer fails the whole search.
    pub async fn search_cards(&self, identities: &[String]) -> Result<Vec<Card>> {
        if identities.is_empty() || identities.iter().any(String::is_empty) {
            return Err(ValidationError::EmptyIdentity.into());
        }

        let transport = &self.transport;
        let models = self
            .with_token(TokenContext::new("search"), |token| async move {
                transport.search_cards(identities, &token).await
            })
            .await?;

        let requested: HashSet<&str> = identities.iter().map(String::as_str).collect();
        let mut cards = Vec::with_capacity(models.len());
        for model in &models {
            let card = Card::from_signed_model(self.crypto.as_ref(), model)?;
            if !requested.contains(card.identity()) {
                warn!(card_id = %card.id(), identity = card.identity(), "search returned an unrequested identity");
                return Err(VerificationError::UnexpectedIdentity {
                    card_id: *card.id(),
                    identity: card.identity().to_string(),
                }
                .into());
            }
            self.ensure_trusted(&card)?;
            cards.push(card);
        }

        let current = resolve_supersession(cards);
        debug!(
            identities = identities.len(),
            fetched = models.len(),
            current = current.len(),
            "search resolved"
        );
        Ok(current)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Import / Export
    // ─────────────────────────────────────────────────────────────────────────

    /// Decode and verify a card from any exported shape.
    pub fn import_card(&self, source: impl Into<CardSource>) -> Result<Card> {
        let model = source.into().into_model()?;
        let card = Card::from_signed_model(self.crypto.as_ref(), &model)?;
        self.ensure_trusted(&card)?;
        Ok(card)
    }

    /// Base64-wrapped model JSON.
    pub fn export_card_to_string(&self, card: &Card) -> Result<String> {
        Ok(card.to_raw_model().to_base64_string()?)
    }

    pub fn export_card_to_json(&self, card: &Card) -> Result<Value> {
        Ok(card.to_raw_model().to_json_value()?)
    }

    pub fn export_card_to_raw_card(&self, card: &Card) -> RawSignedModel {
        card.to_raw_model()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    fn ensure_trusted(&self, card: &Card) -> Result<()> {
        if let Err(e) = self.verifier.ensure_trusted(card) {
            warn!(card_id = %card.id(), identity = card.identity(), "card rejected by trust policy");
            return Err(e.into());
        }
        Ok(())
    }

    /// Run a directory call with a token, retrying once with a reloaded
    /// token on an unauthorized answer when configured.
    async fn with_token<F, Fut, R>(&self, context: TokenContext, call: F) -> Result<R>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = cardkit_transport::Result<R>>,
    {
        let token = self.token_provider.get_token(&context).await?;
        match call(token.to_string()).await {
            Err(e) if e.is_unauthorized() && self.config.retry_on_unauthorized => {
                warn!(operation = %context.operation, error = %e, "retrying with a reloaded token");
                let context = context.force_reload(true);
                let token = self.token_provider.get_token(&context).await?;
                Ok(call(token.to_string()).await?)
            }
            result => Ok(result?),
        }
    }
}

/// Drop every card that a newer card in the same set names as its
/// predecessor.
///
/// A link counts only between distinct cards of the same identity. The older
/// card is marked outdated and attached to the newer one. Cards whose
/// predecessor is absent are returned unchanged. Order follows the input.
pub fn resolve_supersession(cards: Vec<Card>) -> Vec<Card> {
    let mut seen = HashSet::new();
    let mut cards: Vec<Card> = cards.into_iter().filter(|c| seen.insert(*c.id())).collect();

    let index: HashMap<CardId, usize> = cards
        .iter()
        .enumerate()
        .map(|(i, card)| (*card.id(), i))
        .collect();

    let predecessor: Vec<Option<usize>> = cards
        .iter()
        .enumerate()
        .map(|(i, card)| {
            let j = *index.get(card.previous_card_id()?)?;
            (j != i && cards[j].identity() == card.identity()).then_some(j)
        })
        .collect();

    let superseded: HashSet<usize> = predecessor.iter().flatten().copied().collect();
    for &j in &superseded {
        cards[j].mark_outdated();
    }

    (0..cards.len())
        .filter(|i| !superseded.contains(i))
        .map(|i| with_history(&cards, &predecessor, i, cards.len()))
        .collect()
}

fn with_history(cards: &[Card], predecessor: &[Option<usize>], i: usize, depth: usize) -> Card {
    let mut card = cards[i].clone();
    if let Some(j) = predecessor[i] {
        if depth > 0 {
            card.set_previous_card(with_history(cards, predecessor, j, depth - 1));
        }
    }
    card
}
