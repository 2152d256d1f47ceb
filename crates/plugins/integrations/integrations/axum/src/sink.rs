//! Hand-off point for verified webhooks.

use async_trait::async_trait;
use http::HeaderMap;
use bytes::Bytes;
use hookgate_core::ProviderId;

/// A webhook that passed verification.
///
/// `organization_id` is the verified attribution. Nothing else in the
/// request should be used to decide which tenant it belongs to.
#[derive(Debug, Clone)]
pub struct VerifiedWebhook {
    /// Sending platform.
    pub provider: ProviderId,
    /// Organization the webhook is attributed to.
    pub organization_id: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Raw body, exactly as verified.
    pub body: Bytes,
}

/// Error raised by a sink that could not accept a webhook.
#[derive(Debug, thiserror::Error)]
#[error("Webhook sink error: {0}")]
pub struct SinkError(pub String);

/// Receives verified webhooks. Business effects live behind this trait.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    /// Accepts one verified webhook.
    async fn accept(&self, webhook: VerifiedWebhook) -> Result<(), SinkError>;
}
