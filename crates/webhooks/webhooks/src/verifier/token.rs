use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookgate_core::{ExtractedSignature, GatewayError, GatewayResult, ProviderCredentials};
use hookgate_jwt::{BearerTokenVerifier, JwtError, TokenExpectations};

use super::{SignatureVerifier, Verification};

/// Bearer JWTs verified against the issuer's key set (google_like).
#[derive(Clone)]
pub struct PushTokenVerifier {
    tokens: BearerTokenVerifier,
}

impl PushTokenVerifier {
    /// Wraps a configured token verifier.
    pub fn new(tokens: BearerTokenVerifier) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl SignatureVerifier for PushTokenVerifier {
    async fn verify(
        &self,
        _body: &[u8],
        extracted: &ExtractedSignature,
        credentials: &ProviderCredentials,
        now: DateTime<Utc>,
    ) -> GatewayResult<Verification> {
        let audience = credentials
            .audience
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or(GatewayError::MissingCredential { field: "audience" })?;

        let mut expected = TokenExpectations::audience(audience);
        if let Some(email) = credentials.service_account.as_deref() {
            expected = expected.with_email(email);
        }

        match self.tokens.verify(&extracted.signature, &expected, now.timestamp()).await {
            Ok(_) => Ok(Verification::Verified),
            Err(JwtError::Expired) => Ok(Verification::Expired),
            Err(JwtError::KeySetUnavailable(message)) => {
                Err(GatewayError::fetch("jwks", message))
            }
            Err(err) => {
                tracing::debug!(error = %err, "Bearer token rejected");
                Ok(Verification::Mismatch)
            }
        }
    }
}
