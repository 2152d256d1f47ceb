//! HMAC-SHA256 signature generation and comparison.

use hmac::{Hmac, Mac};
use hookgate_core::{timing_safe_eq, GatewayError, GatewayResult};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the hub signature header value.
pub const HUB_SIGNATURE_PREFIX: &str = "sha256=";

/// Computes and checks HMAC-SHA256 digests for one shared secret.
///
/// Produces the same hex digests the HMAC verifiers expect, so callers can
/// sign fixtures and tooling payloads with it.
#[derive(Clone)]
pub struct HmacSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}

impl HmacSigner {
    /// Creates a signer keyed with `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> GatewayResult<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|e| GatewayError::key_material(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Raw digest over the concatenation of `parts`.
    pub fn digest(&self, parts: &[&[u8]]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        for part in parts {
            mac.update(part);
        }
        mac.finalize().into_bytes().to_vec()
    }

    /// Hex digest of the raw body.
    pub fn sign_body(&self, body: &[u8]) -> String {
        hex::encode(self.digest(&[body]))
    }

    /// Hex digest of `"{timestamp}.{body}"`.
    pub fn sign_timestamped(&self, timestamp: i64, body: &[u8]) -> String {
        let timestamp = timestamp.to_string();
        hex::encode(self.digest(&[timestamp.as_bytes(), b".", body]))
    }

    /// Full `X-Hub-Signature-256` header value for `body`.
    pub fn hub_signature_header(&self, body: &[u8]) -> String {
        format!("{}{}", HUB_SIGNATURE_PREFIX, self.sign_body(body))
    }

    /// Full `Stripe-Signature` header value for `body` signed at `timestamp`.
    pub fn timestamped_signature_header(&self, timestamp: i64, body: &[u8]) -> String {
        format!("t={},v1={}", timestamp, self.sign_timestamped(timestamp, body))
    }

    /// Checks a hex `signature` against the digest of `parts`.
    ///
    /// Undecodable hex is a mismatch. Decoded bytes are compared in
    /// constant time.
    pub fn verify_hex(&self, parts: &[&[u8]], signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature) else {
            return false;
        };
        timing_safe_eq(&self.digest(parts), &provided)
    }
}
