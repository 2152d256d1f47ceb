//! Per-provider signature extraction.
//!
//! Extractors are pure functions over request headers. A missing,
//! incomplete or malformed header yields `None`, which the validator turns
//! into `MISSING_SIGNATURE`. Nothing here panics or allocates secrets.

use http::HeaderMap;
use hookgate_core::request::header_str;
use hookgate_core::{ExtractedSignature, ProviderId, SignatureAlgorithm};

use crate::signature::HUB_SIGNATURE_PREFIX;

/// Hub signature header (meta, whatsapp).
pub const HUB_SIGNATURE_HEADER: &str = "x-hub-signature-256";
/// Timestamped signature header (stripe_like).
pub const TIMESTAMPED_SIGNATURE_HEADER: &str = "stripe-signature";
/// Transmission signature header (paypal_like).
pub const TRANSMISSION_SIG_HEADER: &str = "paypal-transmission-sig";
/// Transmission id header (paypal_like).
pub const TRANSMISSION_ID_HEADER: &str = "paypal-transmission-id";
/// Transmission time header (paypal_like).
pub const TRANSMISSION_TIME_HEADER: &str = "paypal-transmission-time";
/// Signing certificate location header (paypal_like).
pub const TRANSMISSION_CERT_URL_HEADER: &str = "paypal-cert-url";

/// Signature of an extractor function.
pub type Extractor = fn(&HeaderMap) -> Option<ExtractedSignature>;

/// Returns the extractor for `provider`.
pub fn extractor_for(provider: ProviderId) -> Extractor {
    match provider {
        ProviderId::Meta | ProviderId::WhatsApp => extract_hub_signature,
        ProviderId::StripeLike => extract_timestamped_signature,
        ProviderId::PaypalLike => extract_transmission_signature,
        ProviderId::GoogleLike => extract_bearer_token,
    }
}

/// Reads `X-Hub-Signature-256: sha256=<hex>`.
pub fn extract_hub_signature(headers: &HeaderMap) -> Option<ExtractedSignature> {
    let value = header_str(headers, HUB_SIGNATURE_HEADER)?;
    let hex = value.strip_prefix(HUB_SIGNATURE_PREFIX)?.trim();
    if hex.is_empty() {
        return None;
    }
    Some(ExtractedSignature::new(hex, SignatureAlgorithm::Sha256))
}

/// Reads `Stripe-Signature: t=<unix>,v1=<hex>[,...]`.
///
/// Both fields must be present and `t` must be an integer. When several
/// `v1` entries are sent, the first one is used.
pub fn extract_timestamped_signature(headers: &HeaderMap) -> Option<ExtractedSignature> {
    let value = header_str(headers, TIMESTAMPED_SIGNATURE_HEADER)?;
    let fields = parse_signature_fields(value);

    let timestamp = first_field(&fields, "t")?;
    timestamp.parse::<i64>().ok()?;
    let signature = first_field(&fields, "v1")?;

    Some(ExtractedSignature::new(signature, SignatureAlgorithm::Sha256).with_timestamp(timestamp))
}

/// Reads the transmission headers. Signature, id and time are all
/// required; the certificate URL is carried along when present.
pub fn extract_transmission_signature(headers: &HeaderMap) -> Option<ExtractedSignature> {
    let signature = header_str(headers, TRANSMISSION_SIG_HEADER)?;
    let transmission_id = header_str(headers, TRANSMISSION_ID_HEADER)?;
    let transmission_time = header_str(headers, TRANSMISSION_TIME_HEADER)?;

    let mut extracted = ExtractedSignature::new(signature, SignatureAlgorithm::RsaSha256)
        .with_timestamp(transmission_time)
        .with_transmission_id(transmission_id);
    if let Some(url) = header_str(headers, TRANSMISSION_CERT_URL_HEADER) {
        extracted = extracted.with_cert_url(url);
    }
    Some(extracted)
}

/// Reads `Authorization: Bearer <jwt>`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<ExtractedSignature> {
    let value = header_str(headers, http::header::AUTHORIZATION.as_str())?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(ExtractedSignature::new(token, SignatureAlgorithm::Jwt))
}

/// Splits a comma-joined `key=value` list. Entries without `=` are skipped.
fn parse_signature_fields(header: &str) -> Vec<(&str, &str)> {
    header
        .split(',')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect()
}

fn first_field<'a>(fields: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, v)| *k == key && !v.is_empty())
        .map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_hub_signature() {
        let extracted =
            extract_hub_signature(&headers(&[("X-Hub-Signature-256", "sha256=abcdef")])).unwrap();
        assert_eq!(extracted.signature, "abcdef");
        assert_eq!(extracted.algorithm, SignatureAlgorithm::Sha256);
        assert_eq!(extracted.timestamp, None);
    }

    #[test]
    fn test_hub_signature_requires_prefix() {
        assert!(extract_hub_signature(&headers(&[("x-hub-signature-256", "abcdef")])).is_none());
        assert!(extract_hub_signature(&headers(&[("x-hub-signature-256", "sha256=")])).is_none());
        assert!(extract_hub_signature(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_timestamped_signature() {
        let extracted = extract_timestamped_signature(&headers(&[(
            "Stripe-Signature",
            "t=1700000000,v1=aaaa,v0=bbbb,v1=cccc",
        )]))
        .unwrap();
        assert_eq!(extracted.timestamp.as_deref(), Some("1700000000"));
        assert_eq!(extracted.signature, "aaaa");
    }

    #[test]
    fn test_timestamped_signature_needs_both_fields() {
        for value in ["t=1700000000", "v1=aaaa", "t=,v1=aaaa", "t=yesterday,v1=aaaa", "garbage"] {
            assert!(
                extract_timestamped_signature(&headers(&[("stripe-signature", value)])).is_none(),
                "{value} should not extract"
            );
        }
    }

    #[test]
    fn test_transmission_headers() {
        let map = headers(&[
            (TRANSMISSION_SIG_HEADER, "c2ln"),
            (TRANSMISSION_ID_HEADER, "tx-1"),
            (TRANSMISSION_TIME_HEADER, "2024-01-01T00:00:00Z"),
            (TRANSMISSION_CERT_URL_HEADER, "https://api.paypal.com/cert.pem"),
        ]);
        let extracted = extract_transmission_signature(&map).unwrap();
        assert_eq!(extracted.algorithm, SignatureAlgorithm::RsaSha256);
        assert_eq!(extracted.transmission_id.as_deref(), Some("tx-1"));
        assert_eq!(extracted.timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(extracted.cert_url.as_deref(), Some("https://api.paypal.com/cert.pem"));
    }

    #[test]
    fn test_transmission_cert_url_is_optional_at_extraction() {
        let map = headers(&[
            (TRANSMISSION_SIG_HEADER, "c2ln"),
            (TRANSMISSION_ID_HEADER, "tx-1"),
            (TRANSMISSION_TIME_HEADER, "2024-01-01T00:00:00Z"),
        ]);
        assert_eq!(extract_transmission_signature(&map).unwrap().cert_url, None);
    }

    #[test]
    fn test_bearer_token() {
        let extracted =
            extract_bearer_token(&headers(&[("authorization", "bearer abc.def.ghi")])).unwrap();
        assert_eq!(extracted.signature, "abc.def.ghi");
        assert_eq!(extracted.algorithm, SignatureAlgorithm::Jwt);

        assert!(extract_bearer_token(&headers(&[("authorization", "Basic dXNlcjpwYXNz")])).is_none());
        assert!(extract_bearer_token(&headers(&[("authorization", "Bearer")])).is_none());
        assert!(extract_bearer_token(&headers(&[("authorization", "Bearer   ")])).is_none());
    }

    #[test]
    fn test_extractor_dispatch() {
        let map = headers(&[("x-hub-signature-256", "sha256=abcdef")]);
        assert!(extractor_for(ProviderId::Meta)(&map).is_some());
        assert!(extractor_for(ProviderId::WhatsApp)(&map).is_some());
        assert!(extractor_for(ProviderId::StripeLike)(&map).is_none());
    }
}
