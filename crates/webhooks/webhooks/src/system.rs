//! Webhook gateway - main entry point.

use hookgate_core::{ErrorReason, ProviderId, ValidationResult, WebhookRequest};
use std::sync::Arc;

use crate::challenge::{ChallengeQuery, ChallengeRejected};
use crate::rate_limiter::{RateLimitDecision, WebhookRateLimiter};
use crate::validator::WebhookValidator;

/// Rate limiter and validator composed in request order.
///
/// The limiter always runs first, so a limited client never reaches the
/// credential store or any cryptographic routine.
#[derive(Clone)]
pub struct WebhookGateway {
    limiter: Arc<WebhookRateLimiter>,
    validator: Arc<WebhookValidator>,
}

impl WebhookGateway {
    /// Creates a gateway.
    pub fn new(limiter: Arc<WebhookRateLimiter>, validator: Arc<WebhookValidator>) -> Self {
        Self { limiter, validator }
    }

    /// Rate limits, then validates a payload delivery.
    pub async fn handle(
        &self,
        request: &WebhookRequest,
        provider_tag: &str,
        organization_id: &str,
    ) -> ValidationResult {
        match self.admit(request).await {
            Some(rejection) => rejection,
            None => {
                self.validator
                    .validate_webhook(request, provider_tag, organization_id)
                    .await
            }
        }
    }

    /// Answers a subscription handshake. The request is rate limited like
    /// any other.
    pub async fn verify_subscription(
        &self,
        request: &WebhookRequest,
        provider_tag: &str,
        organization_id: &str,
        query: &ChallengeQuery,
    ) -> Result<String, ChallengeRejected> {
        if self.admit(request).await.is_some() {
            return Err(ChallengeRejected);
        }
        let provider = provider_tag.parse::<ProviderId>().map_err(|_| ChallengeRejected)?;
        self.validator
            .verify_subscription(provider, organization_id, query)
            .await
    }

    /// Returns the rate limiter.
    pub fn rate_limiter(&self) -> &Arc<WebhookRateLimiter> {
        &self.limiter
    }

    /// Returns the validator.
    pub fn validator(&self) -> &Arc<WebhookValidator> {
        &self.validator
    }

    /// Counts the request. Returns the rejection if it may not proceed.
    async fn admit(&self, request: &WebhookRequest) -> Option<ValidationResult> {
        match self.limiter.check(request.client_ip).await {
            Ok(RateLimitDecision::Allowed { .. }) => None,
            Ok(RateLimitDecision::Limited { .. }) => {
                Some(ValidationResult::rejected(ErrorReason::TooManyRequests))
            }
            Err(e) => {
                tracing::error!(error = %e, "Rate limit store failed, rejecting request");
                Some(ValidationResult::rejected(ErrorReason::ValidationFailed))
            }
        }
    }
}
