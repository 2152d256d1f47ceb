//! Gateway configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum age, in seconds, tolerated between a signed timestamp and
/// verification time.
pub const DEFAULT_REPLAY_TOLERANCE_SECS: i64 = 300;

/// Time budget for one credential lookup.
pub const DEFAULT_CREDENTIAL_TIMEOUT_MS: u64 = 2_000;

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Replay tolerance for timestamped signatures, in seconds.
    pub replay_tolerance_secs: i64,
    /// Credential lookup timeout, in milliseconds.
    pub credential_timeout_ms: u64,
    /// Request rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Certificate-signed transmissions.
    pub paypal: TransmissionConfig,
    /// Bearer token pushes.
    pub google: TokenConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            replay_tolerance_secs: DEFAULT_REPLAY_TOLERANCE_SECS,
            credential_timeout_ms: DEFAULT_CREDENTIAL_TIMEOUT_MS,
            rate_limit: RateLimitConfig::default(),
            paypal: TransmissionConfig::default(),
            google: TokenConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Creates a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the replay tolerance.
    pub fn replay_tolerance_secs(mut self, secs: i64) -> Self {
        self.replay_tolerance_secs = secs;
        self
    }

    /// Sets the credential lookup timeout.
    pub fn credential_timeout_ms(mut self, ms: u64) -> Self {
        self.credential_timeout_ms = ms;
        self
    }

    /// Sets the rate limit configuration.
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Sets the transmission configuration.
    pub fn paypal(mut self, paypal: TransmissionConfig) -> Self {
        self.paypal = paypal;
        self
    }

    /// Sets the token configuration.
    pub fn google(mut self, google: TokenConfig) -> Self {
        self.google = google;
        self
    }

    /// Credential lookup timeout as a `Duration`.
    pub fn credential_timeout(&self) -> Duration {
        Duration::from_millis(self.credential_timeout_ms)
    }
}

/// Configuration for rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// Maximum number of requests allowed within the window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Counters idle for longer than this are evicted, in seconds.
    pub idle_eviction_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 1000,
            window_secs: 15 * 60,
            idle_eviction_secs: 30 * 60,
        }
    }
}

impl RateLimitConfig {
    /// Creates a new rate limit config.
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
            ..Default::default()
        }
    }

    /// Disables rate limiting.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Window length as a chrono duration.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_secs as i64)
    }

    /// Idle eviction threshold as a chrono duration.
    pub fn idle_eviction(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.idle_eviction_secs as i64)
    }
}

/// Configuration for certificate-signed transmissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmissionConfig {
    /// Hosts certificates may be downloaded from (https only).
    pub cert_hosts: Vec<String>,
    /// How long a downloaded certificate is trusted, in seconds.
    pub cert_cache_ttl_secs: u64,
    /// Timeout for certificate downloads, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Hold the transmission time to the replay tolerance.
    pub enforce_replay_window: bool,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            cert_hosts: vec![
                "api.paypal.com".to_string(),
                "api.sandbox.paypal.com".to_string(),
            ],
            cert_cache_ttl_secs: 3600,
            fetch_timeout_ms: 5_000,
            enforce_replay_window: true,
        }
    }
}

impl TransmissionConfig {
    /// Replaces the certificate host allowlist.
    pub fn cert_hosts(mut self, hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cert_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether the transmission time is held to the replay window.
    pub fn enforce_replay_window(mut self, enforce: bool) -> Self {
        self.enforce_replay_window = enforce;
        self
    }

    /// Certificate cache TTL as a `Duration`.
    pub fn cert_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cert_cache_ttl_secs)
    }
}

/// Configuration for bearer token pushes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// JWKS endpoint of the token issuer.
    pub jwks_url: String,
    /// Accepted `iss` values.
    pub issuers: Vec<String>,
    /// How long a fetched key set is used, in seconds.
    pub jwks_cache_ttl_secs: u64,
    /// Timeout for key set downloads, in milliseconds.
    pub fetch_timeout_ms: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            jwks_url: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
            issuers: vec![
                "https://accounts.google.com".to_string(),
                "accounts.google.com".to_string(),
            ],
            jwks_cache_ttl_secs: 3600,
            fetch_timeout_ms: 5_000,
        }
    }
}

impl TokenConfig {
    /// Key set cache TTL as a `Duration`.
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }
}
