//! # Hookgate Webhooks
//!
//! The inbound webhook authenticity gateway: decides, for every delivery
//! from an external platform, whether the payload can be trusted and which
//! organization it belongs to.
//!
//! ## Features
//!
//! - Per-provider signature extraction from request headers
//! - HMAC-SHA256 verification over the raw body, with a replay window for
//!   timestamped signatures
//! - RSA-SHA256 transmission signatures checked against allowlisted,
//!   cached certificates
//! - Bearer JWT verification against the issuer's key set
//! - Subscription challenge-response
//! - Per-client rate limiting ahead of any cryptographic work
//!
//! ## Example
//!
//! ```rust,ignore
//! use hookgate_webhooks::{GatewayConfig, WebhookGateway, WebhookRateLimiter, WebhookValidator};
//! use std::sync::Arc;
//!
//! let config = GatewayConfig::default();
//! let validator = WebhookValidator::builder(credential_store)
//!     .config(config.clone())
//!     .build()?;
//! let limiter = WebhookRateLimiter::new(config.rate_limit.clone());
//! let gateway = WebhookGateway::new(Arc::new(limiter), Arc::new(validator));
//!
//! let result = gateway.handle(&request, "stripe_like", "org_123").await;
//! if result.is_valid() {
//!     // hand the body to business logic
//! }
//! ```

pub mod certs;
pub mod challenge;
pub mod config;
pub mod extract;
pub mod rate_limiter;
pub mod signature;
pub mod system;
pub mod validator;
pub mod verifier;

pub use certs::{CertificateCache, CertificateSource, SigningCertificate, StaticCertificateSource};
#[cfg(feature = "http-client")]
pub use certs::HttpCertificateSource;
pub use challenge::{verify_challenge, ChallengeQuery, ChallengeRejected};
pub use config::{GatewayConfig, RateLimitConfig, TokenConfig, TransmissionConfig};
pub use rate_limiter::{
    InMemoryRateLimitStore, RateLimitDecision, RateLimitStore, WebhookRateLimiter,
};
pub use signature::HmacSigner;
pub use system::WebhookGateway;
pub use validator::{WebhookValidator, WebhookValidatorBuilder};
pub use verifier::{SignatureVerifier, Verification};

pub use hookgate_core::{ErrorReason, ProviderId, ValidationResult, WebhookRequest};
