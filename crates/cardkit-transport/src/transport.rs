//! Directory transport abstraction.
//!
//! Implementations may speak HTTP or anything else. They return wire models
//! untouched; all trust decisions are made by the caller.

use std::sync::Arc;

use async_trait::async_trait;
use cardkit_core::{CardId, RawSignedModel};

use crate::error::Result;

/// The card directory.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CardTransport: Send + Sync {
    /// Submit a signed model. Returns the model as stored by the directory.
    async fn publish_card(&self, model: &RawSignedModel, token: &str) -> Result<RawSignedModel>;

    /// Fetch one card.
    ///
    /// The flag is the directory's hint that a newer card supersedes this one.
    async fn get_card(&self, card_id: &CardId, token: &str) -> Result<(RawSignedModel, bool)>;

    /// Fetch every card bound to any of the identities.
    async fn search_cards(&self, identities: &[String], token: &str)
        -> Result<Vec<RawSignedModel>>;
}

#[async_trait]
impl<T: CardTransport + ?Sized> CardTransport for Arc<T> {
    async fn publish_card(&self, model: &RawSignedModel, token: &str) -> Result<RawSignedModel> {
        (**self).publish_card(model, token).await
    }

    async fn get_card(&self, card_id: &CardId, token: &str) -> Result<(RawSignedModel, bool)> {
        (**self).get_card(card_id, token).await
    }

    async fn search_cards(
        &self,
        identities: &[String],
        token: &str,
    ) -> Result<Vec<RawSignedModel>> {
        (**self).search_cards(identities, token).await
    }
}
