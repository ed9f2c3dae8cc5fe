//! Token signing, generation and verification.

use std::sync::Arc;
use std::time::Duration;

use cardkit_core::{CardCrypto, PrivateKey, PublicKey};
use serde_json::Value;
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::jwt::{now_secs, Jwt, JwtBody, JwtHeader, JWT_CONTENT_TYPE, JWT_TYPE};

/// Algorithm tag written by [`Ed25519TokenSigner`].
pub const ED25519_ALGORITHM: &str = "EdDSA";

/// Signs and checks the unsigned portion of a token.
pub trait AccessTokenSigner: Send + Sync {
    /// Value of the `alg` header this signer produces.
    fn algorithm(&self) -> &str;

    fn generate_token_signature(&self, data: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>>;

    fn verify_token_signature(&self, data: &[u8], signature: &[u8], public_key: &PublicKey)
        -> bool;
}

/// [`AccessTokenSigner`] backed by the card crypto capability.
#[derive(Clone)]
pub struct Ed25519TokenSigner {
    crypto: Arc<dyn CardCrypto>,
}

impl Ed25519TokenSigner {
    pub fn new(crypto: Arc<dyn CardCrypto>) -> Self {
        Self { crypto }
    }
}

impl AccessTokenSigner for Ed25519TokenSigner {
    fn algorithm(&self) -> &str {
        ED25519_ALGORITHM
    }

    fn generate_token_signature(&self, data: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>> {
        self.crypto
            .generate_signature(data, private_key)
            .map_err(|e| AuthError::SigningFailed(e.to_string()))
    }

    fn verify_token_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        public_key: &PublicKey,
    ) -> bool {
        self.crypto.verify_signature(data, signature, public_key)
    }
}

/// Issues tokens for an application.
#[derive(Clone)]
pub struct JwtGenerator {
    app_id: String,
    api_key: PrivateKey,
    api_key_id: String,
    lifetime: Duration,
    signer: Arc<dyn AccessTokenSigner>,
}

impl JwtGenerator {
    pub fn new(
        app_id: impl Into<String>,
        api_key: PrivateKey,
        api_key_id: impl Into<String>,
        lifetime: Duration,
        signer: Arc<dyn AccessTokenSigner>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            api_key,
            api_key_id: api_key_id.into(),
            lifetime,
            signer,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token valid from now for the configured lifetime.
    pub fn generate_token(&self, identity: &str, additional_data: Option<Value>) -> Result<Jwt> {
        self.generate_token_at(identity, additional_data, now_secs())
    }

    /// Issue a token with an explicit `iat`.
    pub fn generate_token_at(
        &self,
        identity: &str,
        additional_data: Option<Value>,
        issued_at: i64,
    ) -> Result<Jwt> {
        if identity.is_empty() {
            return Err(AuthError::EmptyIdentity);
        }
        if let Some(data) = &additional_data {
            if !data.is_object() {
                return Err(AuthError::InvalidAdditionalData(json_kind(data)));
            }
        }

        let lifetime = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        let expires_at = issued_at.saturating_add(lifetime);
        let header = JwtHeader::new(self.signer.algorithm(), self.api_key_id.clone());
        let body = JwtBody::new(
            &self.app_id,
            identity,
            issued_at,
            expires_at,
            additional_data,
        );

        let unsigned = Jwt::signing_input(&header, &body)?;
        let signature = self
            .signer
            .generate_token_signature(unsigned.as_bytes(), &self.api_key)?;

        debug!(identity, expires_at, "issued token");
        Jwt::from_parts(header, body, signature)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Checks tokens issued under one api key.
///
/// Expiry is not checked here; callers combine this with [`Jwt::is_expired`].
#[derive(Clone)]
pub struct JwtVerifier {
    api_public_key: PublicKey,
    api_key_id: String,
    signer: Arc<dyn AccessTokenSigner>,
}

impl JwtVerifier {
    pub fn new(
        api_public_key: PublicKey,
        api_key_id: impl Into<String>,
        signer: Arc<dyn AccessTokenSigner>,
    ) -> Self {
        Self {
            api_public_key,
            api_key_id: api_key_id.into(),
            signer,
        }
    }

    pub fn verify_token(&self, jwt: &Jwt) -> bool {
        let header = jwt.header();
        if header.kid != self.api_key_id
            || header.alg != self.signer.algorithm()
            || header.typ != JWT_TYPE
            || header.cty != JWT_CONTENT_TYPE
        {
            debug!(kid = %header.kid, alg = %header.alg, "token header mismatch");
            return false;
        }

        self.signer
            .verify_token_signature(jwt.unsigned_data(), jwt.signature(), &self.api_public_key)
    }
}
