//! Route mounting for webhook ingress.

use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use bytes::Bytes;
use hookgate_core::{ProviderId, WebhookRequest};
use hookgate_webhooks::{ChallengeQuery, WebhookGateway};
use std::sync::Arc;

use crate::extractor::{ClientIp, ClientIpSource};
use crate::layer::RateLimitLayer;
use crate::sink::{VerifiedWebhook, WebhookSink};
use crate::GatewayRejection;

/// Options for [`webhook_routes_with_options`].
#[derive(Debug, Clone)]
pub struct WebhookRouteOptions {
    /// Maximum accepted body size in bytes.
    pub body_limit_bytes: usize,
    /// Where the client address used for rate limiting comes from.
    pub client_ip_source: ClientIpSource,
}

impl Default for WebhookRouteOptions {
    fn default() -> Self {
        Self {
            body_limit_bytes: 1024 * 1024,
            client_ip_source: ClientIpSource::ConnectInfo,
        }
    }
}

/// Creates an Axum router receiving webhooks at
/// `/{provider}/{organization_id}`.
///
/// `POST` deliveries are verified and handed to `sink`. `GET` answers
/// subscription handshakes. Every request is rate limited first.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .nest("/api/v1/webhooks", webhook_routes(gateway, sink));
/// ```
pub fn webhook_routes<S>(gateway: WebhookGateway, sink: Arc<dyn WebhookSink>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    webhook_routes_with_options(gateway, sink, WebhookRouteOptions::default())
}

/// [`webhook_routes`] with explicit options.
pub fn webhook_routes_with_options<S>(
    gateway: WebhookGateway,
    sink: Arc<dyn WebhookSink>,
    options: WebhookRouteOptions,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let limiter = gateway.rate_limiter().clone();

    Router::new()
        .route(
            "/{provider}/{organization_id}",
            post(receive_handler).get(challenge_handler),
        )
        .layer(DefaultBodyLimit::max(options.body_limit_bytes))
        .layer(RateLimitLayer::new(limiter))
        .layer(Extension(options.client_ip_source))
        .with_state(WebhookState { gateway, sink })
}

/// Shared state for webhook routes.
#[derive(Clone)]
struct WebhookState {
    gateway: WebhookGateway,
    sink: Arc<dyn WebhookSink>,
}

async fn receive_handler(
    State(state): State<WebhookState>,
    Path((provider, organization_id)): Path<(String, String)>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut request = WebhookRequest::new(headers, body);
    request.client_ip = ip;

    // Already rate limited by the layer
    let result = state
        .gateway
        .validator()
        .validate_webhook(&request, &provider, &organization_id)
        .await;

    let (Some(organization_id), Ok(provider)) =
        (result.organization_id(), provider.parse::<ProviderId>())
    else {
        return GatewayRejection::from(&result).into_response();
    };

    let webhook = VerifiedWebhook {
        provider,
        organization_id: organization_id.to_string(),
        headers: request.headers,
        body: request.body,
    };

    match state.sink.accept(webhook).await {
        Ok(()) => Json(serde_json::json!({ "received": true })).into_response(),
        Err(e) => {
            tracing::error!(provider = %provider, organization_id, error = %e, "Verified webhook was not accepted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "received": false })),
            )
                .into_response()
        }
    }
}

async fn challenge_handler(
    State(state): State<WebhookState>,
    Path((provider, organization_id)): Path<(String, String)>,
    Query(query): Query<ChallengeQuery>,
) -> Response {
    let Ok(provider) = provider.parse::<ProviderId>() else {
        return StatusCode::FORBIDDEN.into_response();
    };

    match state
        .gateway
        .validator()
        .verify_subscription(provider, &organization_id, &query)
        .await
    {
        Ok(challenge) => (StatusCode::OK, challenge).into_response(),
        Err(_) => StatusCode::FORBIDDEN.into_response(),
    }
}
