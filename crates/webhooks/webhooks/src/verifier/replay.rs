use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookgate_core::{ExtractedSignature, GatewayResult, ProviderCredentials};

use super::{require_secret, SignatureVerifier, Verification};
use crate::config::DEFAULT_REPLAY_TOLERANCE_SECS;
use crate::signature::HmacSigner;

/// HMAC-SHA256 over `"{timestamp}.{body}"` with a replay window
/// (stripe_like).
///
/// The window is checked before the digest, so a stale request is
/// `Expired` whether or not its signature is correct.
#[derive(Debug, Clone, Copy)]
pub struct TimestampedSignatureVerifier {
    tolerance_secs: i64,
}

impl Default for TimestampedSignatureVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_TOLERANCE_SECS)
    }
}

impl TimestampedSignatureVerifier {
    /// Creates a verifier accepting timestamps within `tolerance_secs` of now.
    pub fn new(tolerance_secs: i64) -> Self {
        Self { tolerance_secs }
    }

    /// Returns the replay tolerance in seconds.
    pub fn tolerance_secs(&self) -> i64 {
        self.tolerance_secs
    }
}

#[async_trait]
impl SignatureVerifier for TimestampedSignatureVerifier {
    async fn verify(
        &self,
        body: &[u8],
        extracted: &ExtractedSignature,
        credentials: &ProviderCredentials,
        now: DateTime<Utc>,
    ) -> GatewayResult<Verification> {
        let Some(raw) = extracted.timestamp.as_deref() else {
            return Ok(Verification::Mismatch);
        };
        let Ok(timestamp) = raw.parse::<i64>() else {
            return Ok(Verification::Mismatch);
        };

        if now.timestamp().abs_diff(timestamp) > self.tolerance_secs.unsigned_abs() {
            tracing::debug!(timestamp, now = now.timestamp(), "Signed timestamp outside replay window");
            return Ok(Verification::Expired);
        }

        let signer = HmacSigner::new(require_secret(credentials)?)?;
        if signer.verify_hex(&[raw.as_bytes(), b".", body], &extracted.signature) {
            Ok(Verification::Verified)
        } else {
            Ok(Verification::Mismatch)
        }
    }
}
