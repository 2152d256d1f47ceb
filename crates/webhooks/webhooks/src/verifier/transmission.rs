use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use hookgate_core::{ExtractedSignature, GatewayError, GatewayResult, ProviderCredentials};
use jsonwebtoken::Algorithm;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::{SignatureVerifier, Verification};
use crate::certs::CertificateCache;

/// Builds the signed string `transmissionId|transmissionTime|webhookId|hex(sha256(body))`.
pub fn transmission_message(
    transmission_id: &str,
    transmission_time: &str,
    webhook_id: &str,
    body: &[u8],
) -> String {
    format!(
        "{}|{}|{}|{}",
        transmission_id,
        transmission_time,
        webhook_id,
        hex::encode(Sha256::digest(body))
    )
}

/// RSA-SHA256 transmission signatures checked against the sender's
/// published certificate (paypal_like).
pub struct TransmissionVerifier {
    certs: Arc<CertificateCache>,
    replay_tolerance_secs: Option<i64>,
}

impl TransmissionVerifier {
    /// Creates a verifier resolving certificates through `certs`.
    pub fn new(certs: Arc<CertificateCache>) -> Self {
        Self {
            certs,
            replay_tolerance_secs: None,
        }
    }

    /// Also rejects transmissions whose time is further than
    /// `tolerance_secs` from now.
    pub fn with_replay_window(mut self, tolerance_secs: i64) -> Self {
        self.replay_tolerance_secs = Some(tolerance_secs);
        self
    }
}

#[async_trait]
impl SignatureVerifier for TransmissionVerifier {
    async fn verify(
        &self,
        body: &[u8],
        extracted: &ExtractedSignature,
        credentials: &ProviderCredentials,
        now: DateTime<Utc>,
    ) -> GatewayResult<Verification> {
        let webhook_id = credentials
            .webhook_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(GatewayError::MissingCredential { field: "webhook_id" })?;

        let (Some(transmission_id), Some(transmission_time), Some(cert_url)) = (
            extracted.transmission_id.as_deref(),
            extracted.timestamp.as_deref(),
            extracted.cert_url.as_deref(),
        ) else {
            return Ok(Verification::Mismatch);
        };

        if let Some(tolerance) = self.replay_tolerance_secs {
            let Ok(sent_at) = DateTime::parse_from_rfc3339(transmission_time) else {
                return Ok(Verification::Mismatch);
            };
            if now.timestamp().abs_diff(sent_at.timestamp()) > tolerance.unsigned_abs() {
                tracing::debug!(transmission_id, "Transmission time outside replay window");
                return Ok(Verification::Expired);
            }
        }

        if !self.certs.is_allowed(cert_url) {
            tracing::warn!(cert_url, "Transmission names a certificate outside the allowlist");
            return Ok(Verification::Mismatch);
        }

        let Ok(signature) = STANDARD.decode(&extracted.signature) else {
            return Ok(Verification::Mismatch);
        };

        let certificate = self.certs.certificate(cert_url).await?;
        if !certificate.is_valid_at(now) {
            tracing::warn!(cert_url, "Signing certificate is outside its validity period");
            return Ok(Verification::Mismatch);
        }
        let message = transmission_message(transmission_id, transmission_time, webhook_id, body);

        let valid = jsonwebtoken::crypto::verify(
            &URL_SAFE_NO_PAD.encode(signature),
            message.as_bytes(),
            certificate.key(),
            Algorithm::RS256,
        )
        .map_err(|e| GatewayError::key_material(e.to_string()))?;

        Ok(if valid {
            Verification::Verified
        } else {
            Verification::Mismatch
        })
    }
}
