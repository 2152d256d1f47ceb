//! Validation orchestrator.
//!
//! `validate` resolves the extractor and verifier for a provider, reads the
//! signature, looks up the organization's credentials and runs the
//! verifier. Every path ends in a [`ValidationResult`]: absent headers,
//! missing credentials, collaborator faults, timeouts and panics are all
//! folded into a rejection.

use futures_util::FutureExt;
use hookgate_core::{
    Clock, CredentialStore, ErrorReason, GatewayError, GatewayResult, ProviderCredentials,
    ProviderId, SystemClock, ValidationResult, WebhookRequest,
};
use hookgate_jwt::{BearerTokenVerifier, KeySetCache, KeySetSource};
use secrecy::ExposeSecret;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::certs::{CertificateCache, CertificateSource};
use crate::challenge::{ChallengeQuery, ChallengeRejected};
use crate::config::GatewayConfig;
use crate::extract::{self, Extractor};
use crate::verifier::{
    HubSignatureVerifier, PushTokenVerifier, SignatureVerifier, TimestampedSignatureVerifier,
    TransmissionVerifier, Verification,
};

/// Verifies inbound webhooks and attributes them to an organization.
pub struct WebhookValidator {
    credentials: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    credential_timeout: Duration,
    hub: HubSignatureVerifier,
    timestamped: TimestampedSignatureVerifier,
    transmission: TransmissionVerifier,
    token: PushTokenVerifier,
}

impl WebhookValidator {
    /// Starts building a validator over `credentials`.
    pub fn builder(credentials: Arc<dyn CredentialStore>) -> WebhookValidatorBuilder {
        WebhookValidatorBuilder::new(credentials)
    }

    /// Validates a request for a provider given by its wire tag.
    pub async fn validate_webhook(
        &self,
        request: &WebhookRequest,
        provider_tag: &str,
        organization_id: &str,
    ) -> ValidationResult {
        match provider_tag.parse::<ProviderId>() {
            Ok(provider) => self.validate(request, provider, organization_id).await,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected webhook for unknown provider");
                ValidationResult::rejected(ErrorReason::UnsupportedProvider)
            }
        }
    }

    /// Validates a request for `provider`.
    pub async fn validate(
        &self,
        request: &WebhookRequest,
        provider: ProviderId,
        organization_id: &str,
    ) -> ValidationResult {
        let outcome = AssertUnwindSafe(self.run(request, provider, organization_id))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(fault)) => {
                tracing::warn!(
                    provider = %provider,
                    organization_id,
                    error = %fault,
                    "Webhook validation failed"
                );
                ValidationResult::rejected(ErrorReason::ValidationFailed)
            }
            Err(_) => {
                tracing::error!(
                    provider = %provider,
                    organization_id,
                    "Webhook validation panicked"
                );
                ValidationResult::rejected(ErrorReason::ValidationFailed)
            }
        };

        match result.error() {
            None => tracing::debug!(provider = %provider, organization_id, "Webhook verified"),
            Some(reason) => {
                tracing::info!(provider = %provider, organization_id, reason = %reason, "Webhook rejected")
            }
        }
        result
    }

    /// Answers a subscription handshake for `provider` with the
    /// organization's verify token.
    pub async fn verify_subscription(
        &self,
        provider: ProviderId,
        organization_id: &str,
        query: &ChallengeQuery,
    ) -> Result<String, ChallengeRejected> {
        if !provider.supports_challenge() {
            return Err(ChallengeRejected);
        }

        let credentials = match self.lookup(organization_id, provider).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return Err(ChallengeRejected),
            Err(e) => {
                tracing::warn!(provider = %provider, organization_id, error = %e, "Verify token lookup failed");
                return Err(ChallengeRejected);
            }
        };
        let Some(expected) = credentials.verify_token.as_ref() else {
            return Err(ChallengeRejected);
        };

        let answer = query.answer(expected.expose_secret());
        if answer.is_err() {
            tracing::info!(provider = %provider, organization_id, "Subscription challenge rejected");
        }
        answer
    }

    /// Returns the extractor and verifier for `provider`.
    fn strategy(&self, provider: ProviderId) -> (Extractor, &dyn SignatureVerifier) {
        (extract::extractor_for(provider), self.verifier_for(provider))
    }

    fn verifier_for(&self, provider: ProviderId) -> &dyn SignatureVerifier {
        match provider {
            ProviderId::Meta | ProviderId::WhatsApp => &self.hub,
            ProviderId::StripeLike => &self.timestamped,
            ProviderId::PaypalLike => &self.transmission,
            ProviderId::GoogleLike => &self.token,
        }
    }

    async fn run(
        &self,
        request: &WebhookRequest,
        provider: ProviderId,
        organization_id: &str,
    ) -> GatewayResult<ValidationResult> {
        let (extract, verifier) = self.strategy(provider);

        let Some(extracted) = extract(&request.headers) else {
            return Ok(ValidationResult::rejected(ErrorReason::MissingSignature));
        };

        let credentials = match self.lookup(organization_id, provider).await? {
            Some(credentials) if credentials.covers(provider) => credentials,
            _ => return Ok(ValidationResult::rejected(ErrorReason::CredentialsNotFound)),
        };

        let verification = verifier
            .verify(&request.body, &extracted, &credentials, self.clock.now())
            .await?;

        Ok(match verification {
            Verification::Verified => ValidationResult::verified(organization_id),
            Verification::Mismatch => ValidationResult::rejected(ErrorReason::InvalidSignature),
            Verification::Expired => ValidationResult::rejected(ErrorReason::ExpiredTimestamp),
        })
    }

    async fn lookup(
        &self,
        organization_id: &str,
        provider: ProviderId,
    ) -> GatewayResult<Option<ProviderCredentials>> {
        tokio::time::timeout(
            self.credential_timeout,
            self.credentials.fetch(organization_id, provider),
        )
        .await
        .map_err(|_| GatewayError::Timeout {
            millis: self.credential_timeout.as_millis() as u64,
        })?
    }
}

/// Builder for [`WebhookValidator`].
pub struct WebhookValidatorBuilder {
    credentials: Arc<dyn CredentialStore>,
    config: GatewayConfig,
    clock: Arc<dyn Clock>,
    certificates: Option<Arc<dyn CertificateSource>>,
    key_set: Option<Arc<dyn KeySetSource>>,
}

impl WebhookValidatorBuilder {
    fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            credentials,
            config: GatewayConfig::default(),
            clock: Arc::new(SystemClock),
            certificates: None,
            key_set: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets where transmission certificates are fetched from.
    pub fn certificate_source(mut self, source: Arc<dyn CertificateSource>) -> Self {
        self.certificates = Some(source);
        self
    }

    /// Sets where the token issuer's key set is fetched from.
    pub fn key_set_source(mut self, source: Arc<dyn KeySetSource>) -> Self {
        self.key_set = Some(source);
        self
    }

    /// Builds the validator. Sources left unset are fetched over HTTPS.
    pub fn build(self) -> GatewayResult<WebhookValidator> {
        let config = self.config;

        let certificates = match self.certificates {
            Some(source) => source,
            None => default_certificate_source(&config)?,
        };
        let key_set = match self.key_set {
            Some(source) => source,
            None => default_key_set_source(&config)?,
        };

        let certs = Arc::new(CertificateCache::new(
            certificates,
            config.paypal.cert_hosts.clone(),
            config.paypal.cert_cache_ttl(),
        ));
        let mut transmission = TransmissionVerifier::new(certs);
        if config.paypal.enforce_replay_window {
            transmission = transmission.with_replay_window(config.replay_tolerance_secs);
        }

        let keys = Arc::new(KeySetCache::new(key_set, config.google.jwks_cache_ttl()));
        let token = PushTokenVerifier::new(BearerTokenVerifier::new(
            keys,
            config.google.issuers.clone(),
        ));

        Ok(WebhookValidator {
            credentials: self.credentials,
            clock: self.clock,
            credential_timeout: config.credential_timeout(),
            hub: HubSignatureVerifier::new(),
            timestamped: TimestampedSignatureVerifier::new(config.replay_tolerance_secs),
            transmission,
            token,
        })
    }
}

#[cfg(feature = "http-client")]
fn default_certificate_source(config: &GatewayConfig) -> GatewayResult<Arc<dyn CertificateSource>> {
    let source = crate::certs::HttpCertificateSource::new(Duration::from_millis(
        config.paypal.fetch_timeout_ms,
    ))?;
    Ok(Arc::new(source))
}

#[cfg(not(feature = "http-client"))]
fn default_certificate_source(_config: &GatewayConfig) -> GatewayResult<Arc<dyn CertificateSource>> {
    Err(GatewayError::config(
        "no certificate source configured and the http-client feature is disabled",
    ))
}

#[cfg(feature = "http-client")]
fn default_key_set_source(config: &GatewayConfig) -> GatewayResult<Arc<dyn KeySetSource>> {
    let source = hookgate_jwt::HttpKeySetSource::new(
        config.google.jwks_url.clone(),
        Duration::from_millis(config.google.fetch_timeout_ms),
    )
    .map_err(|e| GatewayError::config(e.to_string()))?;
    Ok(Arc::new(source))
}

#[cfg(not(feature = "http-client"))]
fn default_key_set_source(_config: &GatewayConfig) -> GatewayResult<Arc<dyn KeySetSource>> {
    Err(GatewayError::config(
        "no key set source configured and the http-client feature is disabled",
    ))
}
