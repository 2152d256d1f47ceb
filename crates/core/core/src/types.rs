//! Core data types for Hookgate.
//!
//! This module defines the provider enumeration, the normalized signature
//! tuple produced by extractors, the per-organization credential record, and
//! the single verdict type handed back to callers.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of platforms the gateway accepts webhooks from.
///
/// `Meta` and `WhatsApp` share one verification strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Meta (Facebook/Instagram) app webhooks.
    Meta,
    /// WhatsApp Business Platform webhooks.
    #[serde(rename = "whatsapp")]
    WhatsApp,
    /// Payment processor signing `t=<unix>,v1=<hex>`.
    StripeLike,
    /// Payment processor signing transmissions with a published certificate.
    PaypalLike,
    /// Ads platform authenticating pushes with a bearer JWT.
    GoogleLike,
}

impl ProviderId {
    /// Every supported provider.
    pub const ALL: [ProviderId; 5] = [
        ProviderId::Meta,
        ProviderId::WhatsApp,
        ProviderId::StripeLike,
        ProviderId::PaypalLike,
        ProviderId::GoogleLike,
    ];

    /// Returns the wire tag for this provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Meta => "meta",
            ProviderId::WhatsApp => "whatsapp",
            ProviderId::StripeLike => "stripe_like",
            ProviderId::PaypalLike => "paypal_like",
            ProviderId::GoogleLike => "google_like",
        }
    }

    /// Returns true if the provider performs subscription handshakes.
    pub fn supports_challenge(&self) -> bool {
        matches!(self, ProviderId::Meta | ProviderId::WhatsApp)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a provider tag is not part of the closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported provider: {0}")]
pub struct UnsupportedProvider(pub String);

impl FromStr for ProviderId {
    type Err = UnsupportedProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnsupportedProvider(s.to_string()))
    }
}

/// Algorithm family of an extracted signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureAlgorithm {
    /// HMAC-SHA256, hex encoded.
    Sha256,
    /// RSA-SHA256 (PKCS#1 v1.5) over a transmission string, base64 encoded.
    RsaSha256,
    /// A signed JSON Web Token.
    Jwt,
}

/// Normalized signature material read from request headers.
///
/// Produced per request and never persisted. An extractor that finds no
/// usable header returns `None` instead of this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSignature {
    /// The signature (hex digest, base64 signature or raw token).
    pub signature: String,
    /// The signed timestamp, when the provider sends one.
    pub timestamp: Option<String>,
    /// The algorithm family.
    pub algorithm: SignatureAlgorithm,
    /// Transmission id for certificate-signed deliveries.
    pub transmission_id: Option<String>,
    /// Certificate location for certificate-signed deliveries.
    pub cert_url: Option<String>,
}

impl ExtractedSignature {
    /// Creates a signature with no timestamp.
    pub fn new(signature: impl Into<String>, algorithm: SignatureAlgorithm) -> Self {
        Self {
            signature: signature.into(),
            timestamp: None,
            algorithm,
            transmission_id: None,
            cert_url: None,
        }
    }

    /// Sets the signed timestamp.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Sets the transmission id.
    pub fn with_transmission_id(mut self, id: impl Into<String>) -> Self {
        self.transmission_id = Some(id.into());
        self
    }

    /// Sets the certificate location.
    pub fn with_cert_url(mut self, url: impl Into<String>) -> Self {
        self.cert_url = Some(url.into());
        self
    }
}

/// Per-organization, per-provider secret material.
///
/// Owned by the external credential store and only borrowed for one
/// verification call. `Debug` output redacts every secret.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderCredentials {
    /// Shared HMAC secret (meta, whatsapp, stripe_like).
    #[serde(default)]
    pub secret: Option<SecretString>,
    /// Verify token for subscription handshakes (meta, whatsapp).
    #[serde(default)]
    pub verify_token: Option<SecretString>,
    /// Webhook id bound into transmission signatures (paypal_like).
    #[serde(default)]
    pub webhook_id: Option<String>,
    /// Expected token audience (google_like).
    #[serde(default)]
    pub audience: Option<String>,
    /// Expected service account `email` claim (google_like, optional).
    #[serde(default)]
    pub service_account: Option<String>,
}

impl ProviderCredentials {
    /// Creates an empty credential record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record holding a shared HMAC secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self::new().secret(secret)
    }

    /// Sets the shared HMAC secret.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::new(secret.into()));
        self
    }

    /// Sets the handshake verify token.
    pub fn verify_token(mut self, token: impl Into<String>) -> Self {
        self.verify_token = Some(SecretString::new(token.into()));
        self
    }

    /// Sets the webhook id.
    pub fn webhook_id(mut self, webhook_id: impl Into<String>) -> Self {
        self.webhook_id = Some(webhook_id.into());
        self
    }

    /// Sets the expected token audience.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the expected service account.
    pub fn service_account(mut self, email: impl Into<String>) -> Self {
        self.service_account = Some(email.into());
        self
    }

    /// Returns true if this record holds what `provider` needs to verify
    /// a payload delivery.
    pub fn covers(&self, provider: ProviderId) -> bool {
        match provider {
            ProviderId::Meta | ProviderId::WhatsApp | ProviderId::StripeLike => self
                .secret
                .as_ref()
                .is_some_and(|s| !s.expose_secret().is_empty()),
            ProviderId::PaypalLike => self.webhook_id.as_deref().is_some_and(|id| !id.is_empty()),
            ProviderId::GoogleLike => self.audience.as_deref().is_some_and(|a| !a.is_empty()),
        }
    }
}

/// Reason a webhook was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorReason {
    /// Required header(s) absent or incomplete.
    MissingSignature,
    /// Extraction succeeded, the cryptographic check failed.
    InvalidSignature,
    /// Outside the replay-tolerance window.
    ExpiredTimestamp,
    /// Provider id not in the closed enumeration.
    UnsupportedProvider,
    /// No secret on file for the (organization, provider) pair.
    CredentialsNotFound,
    /// Rejected by the rate limiter before any crypto work.
    TooManyRequests,
    /// Unexpected fault during extraction or verification.
    ValidationFailed,
}

impl ErrorReason {
    /// Returns the wire code for this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::MissingSignature => "MISSING_SIGNATURE",
            ErrorReason::InvalidSignature => "INVALID_SIGNATURE",
            ErrorReason::ExpiredTimestamp => "EXPIRED_TIMESTAMP",
            ErrorReason::UnsupportedProvider => "UNSUPPORTED_PROVIDER",
            ErrorReason::CredentialsNotFound => "CREDENTIALS_NOT_FOUND",
            ErrorReason::TooManyRequests => "TOO_MANY_REQUESTS",
            ErrorReason::ValidationFailed => "VALIDATION_FAILED",
        }
    }

    /// Returns an HTTP status code appropriate for this reason.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorReason::UnsupportedProvider => 400,
            ErrorReason::TooManyRequests => 429,
            _ => 401,
        }
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verdict for one inbound webhook.
///
/// Only two constructors exist, so a valid result always carries the
/// organization id and a rejected one never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    is_valid: bool,
    organization_id: Option<String>,
    error: Option<ErrorReason>,
}

impl ValidationResult {
    /// A verified webhook attributed to `organization_id`.
    pub fn verified(organization_id: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            organization_id: Some(organization_id.into()),
            error: None,
        }
    }

    /// A rejected webhook. Nothing is attributed.
    pub fn rejected(reason: ErrorReason) -> Self {
        Self {
            is_valid: false,
            organization_id: None,
            error: Some(reason),
        }
    }

    /// Returns true if the webhook may be trusted.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// The organization the webhook is attributed to, if valid.
    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    /// The rejection reason, if rejected.
    pub fn error(&self) -> Option<ErrorReason> {
        self.error
    }
}

/// Fixed-window request counter for one client key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitCounter {
    /// Client key, normally the IP address.
    pub key: String,
    /// When the current window started.
    pub window_start: DateTime<Utc>,
    /// Requests seen in the current window.
    pub count: u32,
    /// Last request timestamp, used for idle eviction.
    pub last_seen: DateTime<Utc>,
}

impl RateLimitCounter {
    /// Creates a counter for the first request of a window.
    pub fn new(key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            window_start: now,
            count: 1,
            last_seen: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("meta".parse::<ProviderId>(), Ok(ProviderId::Meta));
        assert_eq!("WhatsApp".parse::<ProviderId>(), Ok(ProviderId::WhatsApp));
        assert_eq!("stripe_like".parse::<ProviderId>(), Ok(ProviderId::StripeLike));
        assert_eq!(
            "twitter".parse::<ProviderId>(),
            Err(UnsupportedProvider("twitter".to_string()))
        );
    }

    #[test]
    fn test_provider_round_trips_through_tag() {
        for provider in ProviderId::ALL {
            assert_eq!(provider.as_str().parse::<ProviderId>(), Ok(provider));
        }
    }

    #[test]
    fn test_validation_result_invariant() {
        let ok = ValidationResult::verified("org_1");
        assert!(ok.is_valid());
        assert_eq!(ok.organization_id(), Some("org_1"));
        assert_eq!(ok.error(), None);

        let rejected = ValidationResult::rejected(ErrorReason::InvalidSignature);
        assert!(!rejected.is_valid());
        assert_eq!(rejected.organization_id(), None);
        assert_eq!(rejected.error(), Some(ErrorReason::InvalidSignature));
    }

    #[test]
    fn test_validation_result_serialization() {
        let json = serde_json::to_value(ValidationResult::rejected(ErrorReason::ExpiredTimestamp))
            .unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["organizationId"], serde_json::Value::Null);
        assert_eq!(json["error"], "EXPIRED_TIMESTAMP");
    }

    #[test]
    fn test_credentials_cover_providers() {
        let hmac = ProviderCredentials::with_secret("s3cret");
        assert!(hmac.covers(ProviderId::Meta));
        assert!(hmac.covers(ProviderId::StripeLike));
        assert!(!hmac.covers(ProviderId::PaypalLike));
        assert!(!hmac.covers(ProviderId::GoogleLike));

        let paypal = ProviderCredentials::new().webhook_id("WH-1");
        assert!(paypal.covers(ProviderId::PaypalLike));
        assert!(!ProviderCredentials::new().webhook_id("").covers(ProviderId::PaypalLike));
    }

    #[test]
    fn test_empty_secret_does_not_cover_hmac_providers() {
        let empty = ProviderCredentials::with_secret("");
        assert!(!empty.covers(ProviderId::Meta));
        assert!(!empty.covers(ProviderId::WhatsApp));
        assert!(!empty.covers(ProviderId::StripeLike));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = ProviderCredentials::with_secret("top-secret-value").verify_token("vt-123");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("top-secret-value"));
        assert!(!debug.contains("vt-123"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorReason::TooManyRequests.status_code(), 429);
        assert_eq!(ErrorReason::UnsupportedProvider.status_code(), 400);
        assert_eq!(ErrorReason::InvalidSignature.status_code(), 401);
    }
}
