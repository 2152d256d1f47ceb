use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookgate_core::{ExtractedSignature, GatewayResult, ProviderCredentials};

use super::{require_secret, SignatureVerifier, Verification};
use crate::signature::HmacSigner;

/// HMAC-SHA256 over the raw body (meta, whatsapp).
#[derive(Debug, Clone, Copy, Default)]
pub struct HubSignatureVerifier;

impl HubSignatureVerifier {
    /// Creates the verifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SignatureVerifier for HubSignatureVerifier {
    async fn verify(
        &self,
        body: &[u8],
        extracted: &ExtractedSignature,
        credentials: &ProviderCredentials,
        _now: DateTime<Utc>,
    ) -> GatewayResult<Verification> {
        let signer = HmacSigner::new(require_secret(credentials)?)?;

        if signer.verify_hex(&[body], &extracted.signature) {
            Ok(Verification::Verified)
        } else {
            Ok(Verification::Mismatch)
        }
    }
}
