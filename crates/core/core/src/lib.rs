//! # Hookgate Core
//!
//! This crate provides the foundational types and traits for the Hookgate
//! webhook gateway. It defines the data model shared by every provider
//! (`ProviderId`, `ExtractedSignature`, `ValidationResult`), the error
//! taxonomy, the collaborator traits the gateway consumes (credential
//! lookup and clock), and the timing-safe comparator every HMAC check is
//! built on.

pub mod compare;
pub mod error;
pub mod request;
pub mod traits;
pub mod types;

// Re-export commonly used items at the crate root
pub use compare::timing_safe_eq;
pub use error::{GatewayError, GatewayResult};
pub use request::WebhookRequest;
pub use traits::{Clock, CredentialStore, ManualClock, SystemClock};
pub use types::{
    ErrorReason, ExtractedSignature, ProviderCredentials, ProviderId, RateLimitCounter,
    SignatureAlgorithm, UnsupportedProvider, ValidationResult,
};
