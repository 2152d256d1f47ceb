//! Bearer token verification.

use crate::claims::PushTokenClaims;
use crate::jwks::KeySetCache;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use std::sync::Arc;

/// Error type for JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid audience")]
    InvalidAudience,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Unsupported algorithm: {0:?}")]
    UnsupportedAlgorithm(Algorithm),

    #[error("Token header has no key id")]
    MissingKeyId,

    #[error("Unknown signing key: {0}")]
    UnknownKey(String),

    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    #[error("Token email does not match the expected service account")]
    EmailMismatch,

    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(String),
}

impl JwtError {
    /// Returns true if the token itself was rejected, as opposed to the
    /// verifier being unable to reach the key set.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, JwtError::KeySetUnavailable(_))
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            ErrorKind::InvalidAudience => JwtError::InvalidAudience,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            ErrorKind::InvalidAlgorithm => JwtError::Invalid,
            ErrorKind::InvalidToken => JwtError::Invalid,
            ErrorKind::MissingRequiredClaim(claim) => JwtError::MissingClaim(claim.clone()),
            _ => JwtError::DecodingFailed(err.to_string()),
        }
    }
}

/// What a token must assert to be accepted for one organization.
#[derive(Debug, Clone)]
pub struct TokenExpectations {
    /// Required `aud` claim.
    pub audience: String,
    /// Required verified `email` claim, if pinned.
    pub email: Option<String>,
}

impl TokenExpectations {
    /// Expect the given audience.
    pub fn audience(audience: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            email: None,
        }
    }

    /// Also require a verified email claim.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Verifies RS256 bearer tokens against an issuer's published key set.
#[derive(Clone)]
pub struct BearerTokenVerifier {
    keys: Arc<KeySetCache>,
    issuers: Vec<String>,
}

impl BearerTokenVerifier {
    /// Creates a verifier accepting tokens from `issuers`.
    pub fn new(keys: Arc<KeySetCache>, issuers: Vec<String>) -> Self {
        Self { keys, issuers }
    }

    /// Returns the accepted issuers.
    pub fn issuers(&self) -> &[String] {
        &self.issuers
    }

    /// Verifies `token` and returns its claims.
    ///
    /// The signature, `aud` and `iss` are checked by the decoder. Expiry
    /// is checked against `now` (Unix seconds) rather than the wall clock.
    pub async fn verify(
        &self,
        token: &str,
        expected: &TokenExpectations,
        now: i64,
    ) -> Result<PushTokenClaims, JwtError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(JwtError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.kid.ok_or(JwtError::MissingKeyId)?;
        let key = self.keys.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[expected.audience.as_str()]);
        validation.set_issuer(self.issuers.as_slice());
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let claims = decode::<PushTokenClaims>(token, &key, &validation)?.claims;

        if claims.is_expired_at(now) {
            return Err(JwtError::Expired);
        }

        if let Some(ref email) = expected.email {
            if claims.verified_email() != Some(email.as_str()) {
                return Err(JwtError::EmailMismatch);
            }
        }

        Ok(claims)
    }
}
