//! JSON Web Key Set fetching and caching.
//!
//! Issuers rotate their signing keys, so the set is cached with a TTL and
//! refetched early when a token names a `kid` the cached set lacks. Forced
//! refetches are throttled so a stream of tokens with made-up key ids cannot
//! turn into a stream of outbound requests.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::token::JwtError;

/// Where a key set comes from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetches the current key set.
    async fn fetch(&self) -> Result<JwkSet, JwtError>;
}

/// A fixed key set, for tests and pinned deployments.
#[derive(Clone)]
pub struct StaticKeySet {
    keys: JwkSet,
}

impl StaticKeySet {
    /// Wraps a key set.
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl KeySetSource for StaticKeySet {
    async fn fetch(&self) -> Result<JwkSet, JwtError> {
        Ok(self.keys.clone())
    }
}

/// Fetches a key set from the issuer's JWKS endpoint.
#[cfg(feature = "http-client")]
pub struct HttpKeySetSource {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "http-client")]
impl HttpKeySetSource {
    /// Creates a source for `url` with a request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, JwtError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JwtError::KeySetUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Returns the endpoint this source reads from.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "http-client")]
#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, JwtError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| JwtError::KeySetUnavailable(e.to_string()))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| JwtError::KeySetUnavailable(e.to_string()))
    }
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// TTL cache in front of a [`KeySetSource`].
pub struct KeySetCache {
    source: Arc<dyn KeySetSource>,
    ttl: Duration,
    min_refresh_interval: Duration,
    state: RwLock<Option<CachedKeys>>,
}

impl KeySetCache {
    /// Creates a cache with the given TTL and a one-minute floor between
    /// forced refetches.
    pub fn new(source: Arc<dyn KeySetSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            min_refresh_interval: Duration::from_secs(60),
            state: RwLock::new(None),
        }
    }

    /// Sets the minimum interval between forced refetches.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Resolves the decoding key for `kid`.
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, JwtError> {
        {
            let state = self.state.read().await;
            if let Some(cached) = state.as_ref() {
                let age = cached.fetched_at.elapsed();
                if age < self.ttl {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return DecodingKey::from_jwk(jwk).map_err(JwtError::from);
                    }
                    if age < self.min_refresh_interval {
                        tracing::debug!(kid, "Unknown key id, refetch throttled");
                        return Err(JwtError::UnknownKey(kid.to_string()));
                    }
                }
            }
        }

        let keys = self.refresh().await?;
        let jwk = keys
            .find(kid)
            .ok_or_else(|| JwtError::UnknownKey(kid.to_string()))?;
        DecodingKey::from_jwk(jwk).map_err(JwtError::from)
    }

    /// Refetches the key set unconditionally.
    pub async fn refresh(&self) -> Result<JwkSet, JwtError> {
        let keys = self.source.fetch().await?;
        tracing::debug!(count = keys.keys.len(), "Fetched signing key set");

        let mut state = self.state.write().await;
        *state = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }
}
