//! Integration tests for Hookgate Axum
//!
//! Tests cover:
//! - Verified deliveries reaching the sink
//! - Opaque rejections
//! - Subscription handshakes over GET
//! - Rate limiting in front of the handlers

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use hookgate_adapter_memory::MemoryCredentialStore;
use hookgate_axum::*;
use hookgate_core::{ProviderCredentials, ProviderId};
use hookgate_webhooks::{
    GatewayConfig, HmacSigner, RateLimitConfig, WebhookGateway, WebhookRateLimiter,
    WebhookValidator,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

const ORG: &str = "org_1";
const SECRET: &str = "meta-app-secret";
const VERIFY_TOKEN: &str = "verify-me";

#[derive(Default)]
struct RecordingSink {
    received: Mutex<Vec<VerifiedWebhook>>,
}

#[async_trait]
impl WebhookSink for RecordingSink {
    async fn accept(&self, webhook: VerifiedWebhook) -> Result<(), SinkError> {
        self.received.lock().await.push(webhook);
        Ok(())
    }
}

struct App {
    router: Router,
    sink: Arc<RecordingSink>,
    store: MemoryCredentialStore,
}

async fn app(rate_limit: RateLimitConfig) -> App {
    let store = MemoryCredentialStore::new();
    store
        .insert(
            ORG,
            ProviderId::Meta,
            ProviderCredentials::with_secret(SECRET).verify_token(VERIFY_TOKEN),
        )
        .await;

    let config = GatewayConfig::default().rate_limit(rate_limit.clone());
    let validator = WebhookValidator::builder(Arc::new(store.clone()))
        .config(config)
        .build()
        .unwrap();
    let gateway = WebhookGateway::new(
        Arc::new(WebhookRateLimiter::new(rate_limit)),
        Arc::new(validator),
    );

    let sink = Arc::new(RecordingSink::default());
    let router = Router::new()
        .nest("/api/v1/webhooks", webhook_routes(gateway, sink.clone()))
        .layer(MockConnectInfo(SocketAddr::from(([203, 0, 113, 7], 40000))));

    App { router, sink, store }
}

fn delivery(path: &str, body: &'static str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-hub-signature-256", signature)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

mod delivery_tests {
    use super::*;

    #[tokio::test]
    async fn test_verified_delivery_reaches_sink() {
        let app = app(RateLimitConfig::default()).await;
        let body = r#"{"object":"page","entry":[{"id":"1"}]}"#;
        let signature = HmacSigner::new(SECRET).unwrap().hub_signature_header(body.as_bytes());

        let response = app
            .router
            .oneshot(delivery("/api/v1/webhooks/meta/org_1", body, &signature))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "received": true }));

        let received = app.sink.received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].organization_id, ORG);
        assert_eq!(received[0].provider, ProviderId::Meta);
        assert_eq!(received[0].body, body.as_bytes());
    }

    #[tokio::test]
    async fn test_forged_delivery_is_opaque_401() {
        let app = app(RateLimitConfig::default()).await;
        let signature = HmacSigner::new("wrong").unwrap().hub_signature_header(b"{}");

        let response = app
            .router
            .oneshot(delivery("/api/v1/webhooks/meta/org_1", "{}", &signature))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Webhook rejected");
        assert!(!json.to_string().contains("INVALID_SIGNATURE"));
        assert!(app.sink.received.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_signature_and_unknown_org_look_alike() {
        let app = app(RateLimitConfig::default()).await;
        let signature = HmacSigner::new(SECRET).unwrap().hub_signature_header(b"{}");

        let unsigned = Request::builder()
            .method("POST")
            .uri("/api/v1/webhooks/meta/org_1")
            .body(Body::from("{}"))
            .unwrap();
        let a = app.router.clone().oneshot(unsigned).await.unwrap();
        let b = app
            .router
            .oneshot(delivery("/api/v1/webhooks/meta/org_2", "{}", &signature))
            .await
            .unwrap();

        assert_eq!(a.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(b.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(a).await, body_json(b).await);
    }

    #[tokio::test]
    async fn test_unsupported_provider_is_400() {
        let app = app(RateLimitConfig::default()).await;

        let response = app
            .router
            .oneshot(delivery("/api/v1/webhooks/myspace/org_1", "{}", "sha256=00"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.store.lookup_count(), 0);
    }
}

mod challenge_tests {
    use super::*;

    fn handshake(query: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/api/v1/webhooks/meta/org_1?{query}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_handshake_echoes_challenge() {
        let app = app(RateLimitConfig::default()).await;

        let response = app
            .router
            .oneshot(handshake(
                "hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=1158201444",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"1158201444");
    }

    #[tokio::test]
    async fn test_bad_handshakes_are_403() {
        let app = app(RateLimitConfig::default()).await;

        for query in [
            "hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=1",
            "hub.mode=unsubscribe&hub.verify_token=verify-me&hub.challenge=1",
            "hub.mode=subscribe&hub.verify_token=verify-me",
            "",
        ] {
            let response = app.router.clone().oneshot(handshake(query)).await.unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{query}");
        }
    }
}

mod rate_limit_tests {
    use super::*;

    #[tokio::test]
    async fn test_limited_client_gets_429_before_lookup() {
        let app = app(RateLimitConfig::new(2, 900)).await;
        let signature = HmacSigner::new(SECRET).unwrap().hub_signature_header(b"{}");

        for _ in 0..2 {
            let response = app
                .router
                .clone()
                .oneshot(delivery("/api/v1/webhooks/meta/org_1", "{}", &signature))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .router
            .oneshot(delivery("/api/v1/webhooks/meta/org_1", "{}", &signature))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(app.store.lookup_count(), 2);
        assert_eq!(app.sink.received.lock().await.len(), 2);
    }
}
