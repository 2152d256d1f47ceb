//! Integration tests for the Hookgate server
//!
//! Tests cover:
//! - Credentials seeded from configuration
//! - Routes mounted under the configured base path
//! - Custom sinks

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hookgate_axum::{SinkError, VerifiedWebhook, WebhookSink};
use hookgate_core::{CredentialStore, ProviderId};
use hookgate_server::{parse_config, WebhookServer};
use hookgate_webhooks::HmacSigner;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

const CONFIG: &str = r#"
[server]
base_path = "/hooks"

[organizations.acme.meta]
secret = "acme-app-secret"
verify_token = "acme-verify"

[organizations.globex.stripe_like]
secret = "whsec_globex"
"#;

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

fn server() -> WebhookServer {
    WebhookServer::new(parse_config(CONFIG).unwrap())
}

fn meta_delivery(path: &str, secret: &str, body: &'static [u8]) -> Request<Body> {
    let signature = HmacSigner::new(secret).unwrap().hub_signature_header(body);
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-hub-signature-256", signature)
        .body(Body::from(body))
        .unwrap()
}

mod config_tests {
    use super::*;

    #[tokio::test]
    async fn test_credential_store_is_seeded_from_config() {
        let store = server().credential_store().await;

        assert!(store.fetch("acme", ProviderId::Meta).await.unwrap().is_some());
        assert!(store.fetch("globex", ProviderId::StripeLike).await.unwrap().is_some());
        assert!(store.fetch("acme", ProviderId::StripeLike).await.unwrap().is_none());
        assert_eq!(store.len().await, 2);
    }
}

mod router_tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_delivery_reaches_sink() {
        let sink = Arc::new(RecordingSink::default());
        let server = server().with_sink(sink.clone());
        let router = server.router(server.gateway().await.unwrap());

        let response = router
            .oneshot(meta_delivery("/hooks/meta/acme", "acme-app-secret", b"{\"entry\":[]}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let received = sink.received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].organization_id, "acme");
        assert_eq!(received[0].provider, ProviderId::Meta);
    }

    #[tokio::test]
    async fn test_other_organizations_secret_is_rejected() {
        let sink = Arc::new(RecordingSink::default());
        let server = server().with_sink(sink.clone());
        let router = server.router(server.gateway().await.unwrap());

        // globex has no meta credentials
        let response = router
            .oneshot(meta_delivery("/hooks/meta/globex", "acme-app-secret", b"{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(sink.received.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_routes_are_nested_under_base_path() {
        let server = server();
        let router = server.router(server.gateway().await.unwrap());

        let response = router
            .oneshot(meta_delivery("/api/v1/webhooks/meta/acme", "acme-app-secret", b"{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_challenge_uses_configured_verify_token() {
        let server = server();
        let router = server.router(server.gateway().await.unwrap());

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/hooks/meta/acme?hub.mode=subscribe&hub.verify_token=acme-verify&hub.challenge=42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
