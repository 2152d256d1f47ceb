//! # Hookgate Axum Integration
//!
//! This crate provides Axum integration for Hookgate, including:
//! - Webhook route mounting (deliveries and subscription handshakes)
//! - Rate limiting middleware
//! - A client address extractor
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axum::Router;
//! use hookgate_axum::webhook_routes;
//! use std::net::SocketAddr;
//!
//! let app = Router::new().nest("/api/v1/webhooks", webhook_routes(gateway, sink));
//!
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```

mod extractor;
mod layer;
mod routes;
mod sink;

pub use extractor::{client_ip, ClientIp, ClientIpSource};
pub use layer::{RateLimitLayer, RateLimitMiddleware};
pub use routes::{webhook_routes, webhook_routes_with_options, WebhookRouteOptions};
pub use sink::{SinkError, VerifiedWebhook, WebhookSink};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hookgate_core::{ErrorReason, ValidationResult};

/// Opaque HTTP rejection for a webhook that was not accepted.
///
/// The body never says which check failed. Only the status distinguishes
/// an unsupported provider (400) and rate limiting (429) from everything
/// else (401).
pub struct GatewayRejection(pub ErrorReason);

impl IntoResponse for GatewayRejection {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);
        let message = match status {
            StatusCode::TOO_MANY_REQUESTS => "Too many requests",
            StatusCode::BAD_REQUEST => "Unsupported provider",
            _ => "Webhook rejected",
        };
        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<&ValidationResult> for GatewayRejection {
    fn from(result: &ValidationResult) -> Self {
        GatewayRejection(result.error().unwrap_or(ErrorReason::ValidationFailed))
    }
}
