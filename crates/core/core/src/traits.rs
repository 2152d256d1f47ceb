//! Collaborator traits for Hookgate.
//!
//! The gateway never owns secrets or time. Credentials come from an
//! external store that callers implement, and "now" comes from a clock so
//! replay windows and token expiry can be tested deterministically.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

use crate::error::GatewayResult;
use crate::types::{ProviderCredentials, ProviderId};

/// Lookup of per-organization credentials.
///
/// Implementations return `Ok(None)` when nothing is on file. They must
/// never substitute a shared or default secret.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetches the credentials of `organization_id` for `provider`.
    async fn fetch(
        &self,
        organization_id: &str,
        provider: ProviderId,
    ) -> GatewayResult<Option<ProviderCredentials>>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current time as Unix seconds.
    fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Creates a clock frozen at the given Unix timestamp.
    pub fn at_unix(seconds: i64) -> Self {
        Self::new(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }

    /// Sets the current time.
    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at_unix(1_700_000_000);
        assert_eq!(clock.unix_seconds(), 1_700_000_000);

        clock.advance(Duration::seconds(299));
        assert_eq!(clock.unix_seconds(), 1_700_000_299);
    }

    #[test]
    fn test_system_clock_is_current() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}
