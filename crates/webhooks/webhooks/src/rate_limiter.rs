//! Rate Limiter for Webhook Ingress
//!
//! Fixed-window request counting per client IP:
//! - Runs before any credential lookup or cryptographic work
//! - Counters live behind a swappable [`RateLimitStore`]
//! - Idle counters are evicted by a background sweeper

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hookgate_core::{Clock, GatewayResult, RateLimitCounter, SystemClock};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;

/// Key used when the client address is unknown.
pub const UNKNOWN_CLIENT_KEY: &str = "unknown";

/// Storage for rate limit counters.
///
/// `hit` must be atomic per key: the returned counter includes this hit.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Records one request for `key` and returns the updated counter.
    /// A counter whose window has elapsed is restarted.
    async fn hit(&self, key: &str, now: DateTime<Utc>, window: Duration)
        -> GatewayResult<RateLimitCounter>;

    /// Removes counters not seen for `idle`. Returns how many were removed.
    async fn evict_idle(&self, now: DateTime<Utc>, idle: Duration) -> GatewayResult<usize>;
}

/// In-process counter store.
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    counters: Mutex<HashMap<String, RateLimitCounter>>,
}

impl InMemoryRateLimitStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked clients.
    pub async fn len(&self) -> usize {
        self.counters.lock().await.len()
    }

    /// Returns true if no client is tracked.
    pub async fn is_empty(&self) -> bool {
        self.counters.lock().await.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> GatewayResult<RateLimitCounter> {
        let mut counters = self.counters.lock().await;
        let counter = counters
            .entry(key.to_string())
            .and_modify(|c| {
                if now - c.window_start >= window {
                    c.window_start = now;
                    c.count = 1;
                } else {
                    c.count = c.count.saturating_add(1);
                }
                c.last_seen = now;
            })
            .or_insert_with(|| RateLimitCounter::new(key, now));
        Ok(counter.clone())
    }

    async fn evict_idle(&self, now: DateTime<Utc>, idle: Duration) -> GatewayResult<usize> {
        let mut counters = self.counters.lock().await;
        let before = counters.len();
        counters.retain(|_, c| now - c.last_seen < idle);
        Ok(before - counters.len())
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request is allowed.
    Allowed {
        /// Requests left in the current window.
        remaining: u32,
        /// When the current window ends.
        reset_at: DateTime<Utc>,
    },
    /// Request is rejected.
    Limited {
        /// When the current window ends.
        reset_at: DateTime<Utc>,
        /// Seconds until a request will be accepted again.
        retry_after_secs: u64,
    },
}

impl RateLimitDecision {
    /// Returns true if the request may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Per-client request limiter placed in front of verification.
pub struct WebhookRateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl WebhookRateLimiter {
    /// Creates a limiter with an in-memory store and the wall clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(Arc::new(InMemoryRateLimitStore::new()), config, Arc::new(SystemClock))
    }

    /// Creates a limiter over a custom store and clock.
    pub fn with_store(
        store: Arc<dyn RateLimitStore>,
        config: RateLimitConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Counts a request from `client_ip`. A missing address is keyed as
    /// `unknown`.
    pub async fn check(&self, client_ip: Option<IpAddr>) -> GatewayResult<RateLimitDecision> {
        match client_ip {
            Some(ip) => self.check_key(&ip.to_string()).await,
            None => self.check_key(UNKNOWN_CLIENT_KEY).await,
        }
    }

    /// Counts a request for an arbitrary client key.
    pub async fn check_key(&self, key: &str) -> GatewayResult<RateLimitDecision> {
        let now = self.clock.now();
        let window = self.config.window();

        if !self.config.enabled {
            return Ok(RateLimitDecision::Allowed {
                remaining: self.config.max_requests,
                reset_at: now + window,
            });
        }

        let counter = self.store.hit(key, now, window).await?;
        let reset_at = counter.window_start + window;

        if counter.count > self.config.max_requests {
            let retry_after_secs = (reset_at - now).num_seconds().max(1) as u64;
            if counter.count == self.config.max_requests + 1 {
                tracing::warn!(client = key, %reset_at, "Client exceeded webhook rate limit");
            }
            return Ok(RateLimitDecision::Limited {
                reset_at,
                retry_after_secs,
            });
        }

        Ok(RateLimitDecision::Allowed {
            remaining: self.config.max_requests - counter.count,
            reset_at,
        })
    }

    /// Evicts counters idle for longer than the configured threshold.
    pub async fn sweep(&self) -> GatewayResult<usize> {
        let removed = self
            .store
            .evict_idle(self.clock.now(), self.config.idle_eviction())
            .await?;
        if removed > 0 {
            tracing::debug!(removed, "Evicted idle rate limit counters");
        }
        Ok(removed)
    }

    /// Runs [`sweep`](Self::sweep) every `every` until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::warn!(error = %e, "Rate limit sweep failed");
                }
            }
        })
    }
}
