//! Per-provider verification strategies.
//!
//! Every verifier answers with a three-way [`Verification`] or a
//! [`GatewayError`](hookgate_core::GatewayError) when it could not reach a
//! verdict at all. The validator maps the former onto error reasons and the
//! latter onto `VALIDATION_FAILED`.

mod hmac;
mod replay;
mod token;
mod transmission;

pub use self::hmac::HubSignatureVerifier;
pub use self::replay::TimestampedSignatureVerifier;
pub use self::token::PushTokenVerifier;
pub use self::transmission::{transmission_message, TransmissionVerifier};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookgate_core::{ExtractedSignature, GatewayError, GatewayResult, ProviderCredentials};
use secrecy::ExposeSecret;

/// Outcome of a completed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The signature or token is authentic.
    Verified,
    /// The cryptographic check failed.
    Mismatch,
    /// Authentic or not, it is outside the accepted time window.
    Expired,
}

impl Verification {
    /// Returns true for [`Verification::Verified`].
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified)
    }
}

/// A verification strategy for one provider family.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Verifies `extracted` over the raw `body` with the organization's
    /// `credentials`, as of `now`.
    async fn verify(
        &self,
        body: &[u8],
        extracted: &ExtractedSignature,
        credentials: &ProviderCredentials,
        now: DateTime<Utc>,
    ) -> GatewayResult<Verification>;
}

fn require_secret(credentials: &ProviderCredentials) -> GatewayResult<&str> {
    credentials
        .secret
        .as_ref()
        .map(|s| s.expose_secret().as_str())
        .filter(|s| !s.is_empty())
        .ok_or(GatewayError::MissingCredential { field: "secret" })
}
