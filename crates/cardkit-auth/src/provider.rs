//! Token providers.
//!
//! A provider is asked for a token before every directory call. The caching
//! provider keeps one token and refreshes it under a lock, so concurrent
//! callers racing an expired token trigger a single refresh.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::jwt::{now_secs, Jwt};
use crate::signer::JwtGenerator;

/// What the caller is about to do with the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenContext {
    pub identity: Option<String>,
    pub operation: String,
    /// Discard any cached token and fetch a new one.
    pub force_reload: bool,
}

impl TokenContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            identity: None,
            operation: operation.into(),
            force_reload: false,
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn force_reload(mut self, force_reload: bool) -> Self {
        self.force_reload = force_reload;
        self
    }
}

/// Source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self, context: &TokenContext) -> Result<Jwt>;
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct ConstTokenProvider {
    token: Jwt,
}

impl ConstTokenProvider {
    pub fn new(token: Jwt) -> Self {
        Self { token }
    }

    /// Parse the token from its string form.
    pub fn from_token_str(token: &str) -> Result<Self> {
        Ok(Self::new(token.parse()?))
    }
}

#[async_trait]
impl TokenProvider for ConstTokenProvider {
    async fn get_token(&self, _context: &TokenContext) -> Result<Jwt> {
        Ok(self.token.clone())
    }
}

/// Mints a fresh token per call for one identity.
#[derive(Clone)]
pub struct GeneratorTokenProvider {
    generator: JwtGenerator,
    identity: String,
    additional_data: Option<Value>,
}

impl GeneratorTokenProvider {
    pub fn new(generator: JwtGenerator, identity: impl Into<String>) -> Self {
        Self {
            generator,
            identity: identity.into(),
            additional_data: None,
        }
    }

    pub fn with_additional_data(mut self, data: Value) -> Self {
        self.additional_data = Some(data);
        self
    }
}

#[async_trait]
impl TokenProvider for GeneratorTokenProvider {
    async fn get_token(&self, _context: &TokenContext) -> Result<Jwt> {
        self.generator
            .generate_token(&self.identity, self.additional_data.clone())
    }
}

/// Default margin before expiry at which a cached token is refreshed.
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(5);

/// Caches the token of an inner provider until it nears expiry.
pub struct CachingTokenProvider<P> {
    inner: P,
    leeway: Duration,
    cached: Mutex<Option<Jwt>>,
}

impl<P: TokenProvider> CachingTokenProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_leeway(inner, DEFAULT_LEEWAY)
    }

    pub fn with_leeway(inner: P, leeway: Duration) -> Self {
        Self {
            inner,
            leeway,
            cached: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn is_fresh(&self, token: &Jwt) -> bool {
        let margin = i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX);
        !token.is_expired_at(now_secs().saturating_add(margin))
    }
}

#[async_trait]
impl<P: TokenProvider> TokenProvider for CachingTokenProvider<P> {
    async fn get_token(&self, context: &TokenContext) -> Result<Jwt> {
        // Held across the refresh.
        let mut cached = self.cached.lock().await;

        if context.force_reload {
            debug!(operation = %context.operation, "discarding cached token");
            *cached = None;
        }

        if let Some(token) = cached.as_ref() {
            if self.is_fresh(token) {
                return Ok(token.clone());
            }
        }

        let token = self.inner.get_token(context).await?;
        debug!(operation = %context.operation, expires_at = token.expires_at(), "refreshed token");
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn get_token(&self, context: &TokenContext) -> Result<Jwt> {
        (**self).get_token(context).await
    }
}

/// Wrap a plain async closure as a provider.
pub struct CallbackTokenProvider<F> {
    callback: F,
}

impl<F, Fut> CallbackTokenProvider<F>
where
    F: Fn(TokenContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = std::result::Result<String, String>> + Send + 'static,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F, Fut> TokenProvider for CallbackTokenProvider<F>
where
    F: Fn(TokenContext) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = std::result::Result<String, String>> + Send + 'static,
{
    async fn get_token(&self, context: &TokenContext) -> Result<Jwt> {
        let token = (self.callback)(context.clone())
            .await
            .map_err(AuthError::Provider)?;
        token.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::Ed25519TokenSigner;
    use cardkit_core::{Ed25519Crypto, PrivateKey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn generator(lifetime: u64) -> JwtGenerator {
        JwtGenerator::new(
            "app",
            PrivateKey::from_seed(&[0x33; 32]),
            "key",
            Duration::from_secs(lifetime),
            Arc::new(Ed25519TokenSigner::new(Arc::new(Ed25519Crypto::new()))),
        )
    }

    /// Counts how often it was asked.
    struct Counting {
        generator: JwtGenerator,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenProvider for Counting {
        async fn get_token(&self, _context: &TokenContext) -> Result<Jwt> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.generator.generate_token("alice", None)
        }
    }

    fn counting(lifetime: u64) -> Counting {
        Counting {
            generator: generator(lifetime),
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_const_provider() {
        let jwt = generator(60).generate_token("alice", None).unwrap();
        let provider = ConstTokenProvider::from_token_str(&jwt.to_string()).unwrap();
        let got = provider.get_token(&TokenContext::new("get")).await.unwrap();
        assert_eq!(got, jwt);
    }

    #[tokio::test]
    async fn test_generator_provider_issues_for_identity() {
        let provider = GeneratorTokenProvider::new(generator(60), "bob")
            .with_additional_data(serde_json::json!({"device": "phone"}));
        let jwt = provider.get_token(&TokenContext::new("search")).await.unwrap();
        assert_eq!(jwt.identity(), Some("bob"));
        assert_eq!(jwt.body().ada, Some(serde_json::json!({"device": "phone"})));
    }

    #[tokio::test]
    async fn test_caching_reuses_fresh_token() {
        let provider = CachingTokenProvider::new(counting(600));
        let ctx = TokenContext::new("get");

        let a = provider.get_token(&ctx).await.unwrap();
        let b = provider.get_token(&ctx).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_caching_force_reload() {
        let provider = CachingTokenProvider::new(counting(600));

        provider.get_token(&TokenContext::new("get")).await.unwrap();
        provider
            .get_token(&TokenContext::new("get").force_reload(true))
            .await
            .unwrap();
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caching_refreshes_inside_leeway() {
        // Lifetime shorter than the leeway: never considered fresh.
        let provider = CachingTokenProvider::with_leeway(counting(2), Duration::from_secs(10));
        let ctx = TokenContext::new("get");

        provider.get_token(&ctx).await.unwrap();
        provider.get_token(&ctx).await.unwrap();
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caching_huge_leeway_always_refreshes() {
        let provider =
            CachingTokenProvider::with_leeway(counting(600), Duration::from_secs(u64::MAX));
        let ctx = TokenContext::new("get");

        provider.get_token(&ctx).await.unwrap();
        provider.get_token(&ctx).await.unwrap();
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_caching_keeps_token_with_huge_lifetime() {
        let provider = CachingTokenProvider::new(counting(u64::MAX));
        let ctx = TokenContext::new("get");

        provider.get_token(&ctx).await.unwrap();
        provider.get_token(&ctx).await.unwrap();
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_caching_single_flight() {
        let provider = Arc::new(CachingTokenProvider::new(counting(600)));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let provider = Arc::clone(&provider);
            handles.push(tokio::spawn(async move {
                provider.get_token(&TokenContext::new("get")).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_callback_provider() {
        let jwt = generator(60).generate_token("carol", None).unwrap();
        let token = jwt.to_string();
        let provider = CallbackTokenProvider::new(move |ctx: TokenContext| {
            let token = token.clone();
            async move {
                if ctx.operation == "denied" {
                    Err("no".to_string())
                } else {
                    Ok(token)
                }
            }
        });

        let got = provider.get_token(&TokenContext::new("get")).await.unwrap();
        assert_eq!(got.identity(), Some("carol"));
        assert!(matches!(
            provider.get_token(&TokenContext::new("denied")).await,
            Err(AuthError::Provider(_))
        ));
    }
}
