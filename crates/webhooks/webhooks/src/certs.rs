//! Signing certificate resolution for certificate-signed transmissions.
//!
//! A transmission names the certificate that signed it by URL. That URL is
//! attacker-controlled, so it is only followed when it is `https` and its
//! host is on the configured allowlist. Certificates are fetched over TLS,
//! which anchors them in the web PKI, and cached per URL with a TTL.
//! Failed fetches are remembered for a short while so a URL that does not
//! resolve to a certificate is not fetched again on every delivery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookgate_core::{GatewayError, GatewayResult};
use http::Uri;
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// Returns true if `url` is an `https` URL whose host is in `allowed_hosts`.
pub fn is_allowed_cert_url(url: &str, allowed_hosts: &[String]) -> bool {
    let Ok(uri) = url.parse::<Uri>() else {
        return false;
    };
    if uri.scheme_str() != Some("https") {
        return false;
    }
    let Some(host) = uri.host() else {
        return false;
    };
    allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
}

/// Where signing certificates come from.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Fetches the PEM certificate at `url`.
    async fn fetch_pem(&self, url: &str) -> GatewayResult<String>;
}

/// Certificates pinned in memory, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct StaticCertificateSource {
    certs: HashMap<String, String>,
}

impl StaticCertificateSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `pem` for `url`.
    pub fn with_certificate(mut self, url: impl Into<String>, pem: impl Into<String>) -> Self {
        self.certs.insert(url.into(), pem.into());
        self
    }
}

#[async_trait]
impl CertificateSource for StaticCertificateSource {
    async fn fetch_pem(&self, url: &str) -> GatewayResult<String> {
        self.certs
            .get(url)
            .cloned()
            .ok_or_else(|| GatewayError::fetch(url, "certificate not found"))
    }
}

/// Downloads certificates over TLS.
#[cfg(feature = "http-client")]
pub struct HttpCertificateSource {
    client: reqwest::Client,
}

#[cfg(feature = "http-client")]
impl HttpCertificateSource {
    /// Creates a source with a request timeout.
    pub fn new(timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .https_only(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::config(e.to_string()))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http-client")]
#[async_trait]
impl CertificateSource for HttpCertificateSource {
    async fn fetch_pem(&self, url: &str) -> GatewayResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GatewayError::fetch(url, e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| GatewayError::fetch(url, e.to_string()))
    }
}

/// Public key and validity period of a signing certificate.
#[derive(Clone)]
pub struct SigningCertificate {
    key: DecodingKey,
    not_before: i64,
    not_after: i64,
}

impl SigningCertificate {
    /// The RSA public key.
    pub fn key(&self) -> &DecodingKey {
        &self.key
    }

    /// Returns true if `now` falls within notBefore..=notAfter.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let now = now.timestamp();
        self.not_before <= now && now <= self.not_after
    }
}

impl std::fmt::Debug for SigningCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCertificate")
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .finish_non_exhaustive()
    }
}

struct CachedCertificate {
    certificate: SigningCertificate,
    fetched_at: Instant,
}

/// TTL cache of signing certificates in front of a [`CertificateSource`].
///
/// Fetches are single-flight: concurrent misses wait for one request
/// instead of each going out.
pub struct CertificateCache {
    source: Arc<dyn CertificateSource>,
    allowed_hosts: Vec<String>,
    ttl: Duration,
    failure_ttl: Duration,
    entries: RwLock<HashMap<String, CachedCertificate>>,
    failures: RwLock<HashMap<String, Instant>>,
    fetch_lock: Mutex<()>,
}

impl CertificateCache {
    /// Creates a cache that follows URLs on `allowed_hosts` only. Failed
    /// fetches are retried after one minute at the earliest.
    pub fn new(source: Arc<dyn CertificateSource>, allowed_hosts: Vec<String>, ttl: Duration) -> Self {
        Self {
            source,
            allowed_hosts,
            ttl,
            failure_ttl: Duration::from_secs(60),
            entries: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Sets how long a failed fetch is remembered.
    pub fn with_failure_ttl(mut self, failure_ttl: Duration) -> Self {
        self.failure_ttl = failure_ttl;
        self
    }

    /// Returns true if `url` may be fetched.
    pub fn is_allowed(&self, url: &str) -> bool {
        is_allowed_cert_url(url, &self.allowed_hosts)
    }

    /// Resolves the certificate at `url`.
    pub async fn certificate(&self, url: &str) -> GatewayResult<SigningCertificate> {
        if !self.is_allowed(url) {
            return Err(GatewayError::fetch(url, "certificate host is not allowed"));
        }

        if let Some(certificate) = self.lookup(url).await? {
            return Ok(certificate);
        }

        let _guard = self.fetch_lock.lock().await;
        // Another caller may have finished the fetch while we waited
        if let Some(certificate) = self.lookup(url).await? {
            return Ok(certificate);
        }

        match self.fetch(url).await {
            Ok(certificate) => {
                self.failures.write().await.remove(url);
                let mut entries = self.entries.write().await;
                entries.retain(|_, c| c.fetched_at.elapsed() < self.ttl);
                entries.insert(
                    url.to_string(),
                    CachedCertificate {
                        certificate: certificate.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                Ok(certificate)
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Signing certificate fetch failed");
                let mut failures = self.failures.write().await;
                failures.retain(|_, failed_at| failed_at.elapsed() < self.failure_ttl);
                failures.insert(url.to_string(), Instant::now());
                Err(e)
            }
        }
    }

    /// Cached certificate for `url`, or an error while a recent failure
    /// for it is remembered.
    async fn lookup(&self, url: &str) -> GatewayResult<Option<SigningCertificate>> {
        {
            let entries = self.entries.read().await;
            if let Some(cached) = entries.get(url) {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(Some(cached.certificate.clone()));
                }
            }
        }

        let failures = self.failures.read().await;
        if let Some(failed_at) = failures.get(url) {
            if failed_at.elapsed() < self.failure_ttl {
                return Err(GatewayError::fetch(url, "recent fetch failed, retry throttled"));
            }
        }
        Ok(None)
    }

    async fn fetch(&self, url: &str) -> GatewayResult<SigningCertificate> {
        let pem = self.source.fetch_pem(url).await?;
        let certificate = parse_certificate(&pem)?;
        tracing::debug!(url, "Fetched signing certificate");
        Ok(certificate)
    }

    /// Number of cached certificates.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Parses a PEM certificate into its RSA public key and validity period.
pub fn parse_certificate(pem: &str) -> GatewayResult<SigningCertificate> {
    let (_, block) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
        .map_err(|e| GatewayError::key_material(format!("response is not a PEM certificate: {e}")))?;
    if block.label != "CERTIFICATE" {
        return Err(GatewayError::key_material("response is not a PEM certificate"));
    }

    let cert = block
        .parse_x509()
        .map_err(|e| GatewayError::key_material(e.to_string()))?;
    let validity = cert.validity();
    let not_before = validity.not_before.timestamp();
    let not_after = validity.not_after.timestamp();

    let key = DecodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| GatewayError::key_material(e.to_string()))?;

    Ok(SigningCertificate {
        key,
        not_before,
        not_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CERT: &str = include_str!("../tests/fixtures/transmission_cert.pem");
    const EXPIRED_CERT: &str = include_str!("../tests/fixtures/expired_cert.pem");
    const URL: &str = "https://api.paypal.com/v1/notifications/certs/CERT-1";

    struct CountingSource {
        pem: Option<&'static str>,
        delay: Duration,
        fetches: AtomicUsize,
    }

    impl CountingSource {
        fn serving(pem: &'static str) -> Arc<Self> {
            Arc::new(Self {
                pem: Some(pem),
                delay: Duration::ZERO,
                fetches: AtomicUsize::new(0),
            })
        }

        fn missing() -> Arc<Self> {
            Arc::new(Self {
                pem: None,
                delay: Duration::ZERO,
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CertificateSource for CountingSource {
        async fn fetch_pem(&self, url: &str) -> GatewayResult<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.pem
                .map(str::to_string)
                .ok_or_else(|| GatewayError::fetch(url, "404 Not Found"))
        }
    }

    fn hosts() -> Vec<String> {
        vec!["api.paypal.com".to_string()]
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_url_allowlist() {
        let hosts = hosts();
        assert!(is_allowed_cert_url(URL, &hosts));
        assert!(is_allowed_cert_url("https://API.PAYPAL.COM/cert", &hosts));
        assert!(!is_allowed_cert_url("http://api.paypal.com/cert", &hosts));
        assert!(!is_allowed_cert_url("https://evil.example.com/cert", &hosts));
        assert!(!is_allowed_cert_url("https://api.paypal.com.evil.example.com/cert", &hosts));
        assert!(!is_allowed_cert_url("https://api.paypal.com@evil.example.com/cert", &hosts));
        assert!(!is_allowed_cert_url("not a url", &hosts));
    }

    #[test]
    fn test_parse_certificate() {
        assert!(parse_certificate(CERT).is_ok());
        assert!(parse_certificate("<html>hello</html>").is_err());
    }

    #[test]
    fn test_certificate_validity_period() {
        let current = parse_certificate(CERT).unwrap();
        assert!(current.is_valid_at(at("2023-11-14T22:13:20Z")));
        assert!(!current.is_valid_at(at("2019-12-31T23:59:59Z")));

        let expired = parse_certificate(EXPIRED_CERT).unwrap();
        assert!(expired.is_valid_at(at("2021-06-01T00:00:00Z")));
        assert!(!expired.is_valid_at(at("2023-11-14T22:13:20Z")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_ttl() {
        let source = CountingSource::serving(CERT);
        let cache = CertificateCache::new(source.clone(), hosts(), Duration::from_secs(60));

        cache.certificate(URL).await.unwrap();
        cache.certificate(URL).await.unwrap();
        assert_eq!(source.fetches(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        cache.certificate(URL).await.unwrap();
        assert_eq!(source.fetches(), 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_disallowed_url_is_never_fetched() {
        let source = CountingSource::serving(CERT);
        let cache = CertificateCache::new(source.clone(), hosts(), Duration::from_secs(60));

        assert!(cache.certificate("https://evil.example.com/cert.pem").await.is_err());
        assert_eq!(source.fetches(), 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetches_are_remembered_per_url() {
        let source = CountingSource::missing();
        let cache = CertificateCache::new(source.clone(), hosts(), Duration::from_secs(3600))
            .with_failure_ttl(Duration::from_secs(60));
        let urls = [
            "https://api.paypal.com/v1/notifications/certs/MISSING-1",
            "https://api.paypal.com/v1/notifications/certs/MISSING-2",
        ];

        for i in 0..100 {
            assert!(cache.certificate(urls[i % 2]).await.is_err());
        }
        assert_eq!(source.fetches(), 2);
        assert!(cache.is_empty().await);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.certificate(urls[0]).await.is_err());
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_certificate_response_is_remembered() {
        let source = CountingSource::serving("<html>maintenance</html>");
        let cache = CertificateCache::new(source.clone(), hosts(), Duration::from_secs(3600));

        assert!(cache.certificate(URL).await.is_err());
        assert!(cache.certificate(URL).await.is_err());
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_fetch_once() {
        let source = Arc::new(CountingSource {
            pem: Some(CERT),
            delay: Duration::from_millis(200),
            fetches: AtomicUsize::new(0),
        });
        let cache = CertificateCache::new(source.clone(), hosts(), Duration::from_secs(3600));

        let results = join_all((0..20).map(|_| cache.certificate(URL))).await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(source.fetches(), 1);
    }
}
