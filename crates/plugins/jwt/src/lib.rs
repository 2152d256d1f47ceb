//! # Hookgate JWT
//!
//! Verification of the bearer tokens token-authenticated platforms attach to
//! their push deliveries.
//!
//! ## Features
//!
//! - RS256 signature verification against the issuer's JWKS
//! - Key set caching with TTL and throttled refetch on unknown key ids
//! - Audience, issuer and expiry checks, with expiry taken from a caller
//!   supplied clock
//! - Optional pinning of the signing service account
//!
//! ## Example
//!
//! ```rust,ignore
//! use hookgate_jwt::{BearerTokenVerifier, HttpKeySetSource, KeySetCache, TokenExpectations};
//! use std::{sync::Arc, time::Duration};
//!
//! let source = HttpKeySetSource::new(
//!     "https://www.googleapis.com/oauth2/v3/certs",
//!     Duration::from_secs(5),
//! )?;
//! let cache = Arc::new(KeySetCache::new(Arc::new(source), Duration::from_secs(3600)));
//! let verifier = BearerTokenVerifier::new(cache, vec!["https://accounts.google.com".into()]);
//!
//! let claims = verifier
//!     .verify(token, &TokenExpectations::audience("https://hooks.example.com"), now)
//!     .await?;
//! ```

pub mod claims;
pub mod jwks;
pub mod token;

pub use claims::PushTokenClaims;
#[cfg(feature = "http-client")]
pub use jwks::HttpKeySetSource;
pub use jwks::{KeySetCache, KeySetSource, StaticKeySet};
pub use token::{BearerTokenVerifier, JwtError, TokenExpectations};
