//! Rate limiting middleware layer for Axum.

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response};
use axum::response::IntoResponse;
use hookgate_core::ErrorReason;
use hookgate_webhooks::{RateLimitDecision, WebhookRateLimiter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::extractor::client_ip;
use crate::GatewayRejection;

/// Layer that rate limits requests per client before they reach the
/// inner service. The request body is not read when a client is limited.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<WebhookRateLimiter>,
}

impl RateLimitLayer {
    /// Creates a new rate limit layer.
    pub fn new(limiter: Arc<WebhookRateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Middleware service produced by [`RateLimitLayer`].
#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    limiter: Arc<WebhookRateLimiter>,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ip = client_ip(req.extensions(), req.headers());

            match limiter.check(ip).await {
                Ok(RateLimitDecision::Allowed { .. }) => inner.call(req).await,
                Ok(RateLimitDecision::Limited {
                    retry_after_secs, ..
                }) => Ok(too_many_requests(retry_after_secs)),
                Err(e) => {
                    tracing::error!(error = %e, "Rate limit store failed, rejecting request");
                    Ok(GatewayRejection(ErrorReason::ValidationFailed).into_response())
                }
            }
        })
    }
}

fn too_many_requests(retry_after_secs: u64) -> Response<Body> {
    let mut response = GatewayRejection(ErrorReason::TooManyRequests).into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_too_many_requests_response() {
        let response = too_many_requests(42);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
