//! Card verification against a configurable trust policy.
//!
//! The policy is an AND of checks:
//! 1. a valid `"self"` signature under the card's own key (optional)
//! 2. a valid service signature under the injected trust anchor (optional)
//! 3. for every whitelist, at least one listed signer present on the card
//!    whose signature verifies under the listed key
//!
//! A whitelist none of whose signers appear on the card fails the card.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::card::Card;
use crate::crypto::{CardCrypto, PublicKey};
use crate::error::VerificationError;
use crate::signer::{SELF_SIGNER, SERVICE_SIGNER};

/// Something that decides whether a card is trusted.
pub trait CardVerifier: Send + Sync {
    fn verify_card(&self, card: &Card) -> bool;

    /// [`CardVerifier::verify_card`] as a `Result`.
    fn ensure_trusted(&self, card: &Card) -> Result<(), VerificationError> {
        if self.verify_card(card) {
            Ok(())
        } else {
            Err(VerificationError::PolicyRejected { card_id: *card.id() })
        }
    }
}

/// A trusted (signer, public key) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierCredentials {
    pub signer: String,
    pub public_key: PublicKey,
}

impl VerifierCredentials {
    pub fn new(signer: impl Into<String>, public_key: PublicKey) -> Self {
        Self {
            signer: signer.into(),
            public_key,
        }
    }
}

/// A set of alternative trusted signers. One of them must have signed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WhiteList {
    pub credentials: Vec<VerifierCredentials>,
}

impl WhiteList {
    pub fn new(credentials: Vec<VerifierCredentials>) -> Self {
        Self { credentials }
    }

    /// Add one more acceptable signer.
    pub fn with(mut self, credentials: VerifierCredentials) -> Self {
        self.credentials.push(credentials);
        self
    }
}

/// The directory service's signing identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTrustAnchor {
    #[serde(default = "default_service_signer")]
    pub signer: String,
    pub public_key: PublicKey,
}

fn default_service_signer() -> String {
    SERVICE_SIGNER.to_string()
}

impl ServiceTrustAnchor {
    /// Anchor for the well-known `"virgil"` signer id.
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            signer: default_service_signer(),
            public_key,
        }
    }
}

/// Declarative trust policy, loadable from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub verify_self_signature: bool,
    pub verify_service_signature: bool,
    pub white_lists: Vec<WhiteList>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            verify_self_signature: true,
            verify_service_signature: true,
            white_lists: Vec::new(),
        }
    }
}

/// The standard [`CardVerifier`].
#[derive(Clone)]
pub struct TrustPolicyVerifier {
    crypto: Arc<dyn CardCrypto>,
    service: ServiceTrustAnchor,
    verify_self_signature: bool,
    verify_service_signature: bool,
    white_lists: Vec<WhiteList>,
}

impl TrustPolicyVerifier {
    /// Default policy: self and service signatures required, no whitelists.
    pub fn new(crypto: Arc<dyn CardCrypto>, service: ServiceTrustAnchor) -> Self {
        Self::from_config(crypto, service, VerifierConfig::default())
    }

    pub fn from_config(
        crypto: Arc<dyn CardCrypto>,
        service: ServiceTrustAnchor,
        config: VerifierConfig,
    ) -> Self {
        Self {
            crypto,
            service,
            verify_self_signature: config.verify_self_signature,
            verify_service_signature: config.verify_service_signature,
            white_lists: config.white_lists,
        }
    }

    pub fn verify_self_signature(mut self, enabled: bool) -> Self {
        self.verify_self_signature = enabled;
        self
    }

    pub fn verify_service_signature(mut self, enabled: bool) -> Self {
        self.verify_service_signature = enabled;
        self
    }

    pub fn white_list(mut self, list: WhiteList) -> Self {
        self.white_lists.push(list);
        self
    }

    pub fn white_lists(&self) -> &[WhiteList] {
        &self.white_lists
    }

    pub fn service(&self) -> &ServiceTrustAnchor {
        &self.service
    }

    /// Check that `signer` signed the card and the signature verifies
    /// under `public_key`.
    fn check_signer(&self, card: &Card, signer: &str, public_key: &PublicKey) -> bool {
        let Some(signature) = card.signature_of(signer) else {
            return false;
        };
        let payload = card.signed_payload(signature);
        self.crypto
            .verify_signature(&payload, &signature.signature, public_key)
    }
}

impl CardVerifier for TrustPolicyVerifier {
    fn verify_card(&self, card: &Card) -> bool {
        if self.verify_self_signature && !self.check_signer(card, SELF_SIGNER, card.public_key())
        {
            debug!(card_id = %card.id(), "self signature missing or invalid");
            return false;
        }

        if self.verify_service_signature
            && !self.check_signer(card, &self.service.signer, &self.service.public_key)
        {
            debug!(card_id = %card.id(), signer = %self.service.signer, "service signature missing or invalid");
            return false;
        }

        for (index, list) in self.white_lists.iter().enumerate() {
            let mut candidates = list
                .credentials
                .iter()
                .filter(|c| card.signature_of(&c.signer).is_some())
                .peekable();

            if candidates.peek().is_none() {
                debug!(card_id = %card.id(), white_list = index, "no whitelisted signer on card");
                return false;
            }

            if !candidates.any(|c| self.check_signer(card, &c.signer, &c.public_key)) {
                debug!(card_id = %card.id(), white_list = index, "no whitelisted signature verified");
                return false;
            }
        }

        true
    }
}
