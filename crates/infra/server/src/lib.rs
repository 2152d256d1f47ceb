//! # Hookgate Server
//!
//! Standalone webhook ingress service. Credentials for each organization
//! come from the configuration file, verified deliveries are logged, and
//! everything else is rejected before it reaches a handler.

mod config;

pub use config::{load_config, parse_config, ConfigError, HookgateConfig, OrganizationCredentials, ServerConfig};

use async_trait::async_trait;
use axum::Router;
use hookgate_adapter_memory::MemoryCredentialStore;
use hookgate_axum::{
    webhook_routes_with_options, ClientIpSource, SinkError, VerifiedWebhook, WebhookRouteOptions,
    WebhookSink,
};
use hookgate_core::GatewayError;
use hookgate_webhooks::{WebhookGateway, WebhookRateLimiter, WebhookValidator};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Errors raised while starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sink that records verified deliveries in the log and drops the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl WebhookSink for LoggingSink {
    async fn accept(&self, webhook: VerifiedWebhook) -> Result<(), SinkError> {
        tracing::info!(
            provider = %webhook.provider,
            organization_id = %webhook.organization_id,
            bytes = webhook.body.len(),
            "Accepted verified webhook"
        );
        Ok(())
    }
}

/// The webhook ingress server.
pub struct WebhookServer {
    /// Loaded configuration.
    pub config: HookgateConfig,
    sink: Arc<dyn WebhookSink>,
}

impl WebhookServer {
    /// Creates a server that logs verified deliveries.
    pub fn new(config: HookgateConfig) -> Self {
        Self {
            config,
            sink: Arc::new(LoggingSink),
        }
    }

    /// Replaces the sink receiving verified deliveries.
    pub fn with_sink(mut self, sink: Arc<dyn WebhookSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builds a credential store seeded from the `[organizations]` tables.
    pub async fn credential_store(&self) -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        for (org, providers) in &self.config.organizations {
            for (provider, credentials) in providers {
                store.insert(org.clone(), *provider, credentials.clone()).await;
            }
        }
        store
    }

    /// Wires the credential store, validator and rate limiter together.
    pub async fn gateway(&self) -> Result<WebhookGateway, ServerError> {
        let store = self.credential_store().await;
        let validator = WebhookValidator::builder(Arc::new(store))
            .config(self.config.gateway.clone())
            .build()?;
        let limiter = WebhookRateLimiter::new(self.config.gateway.rate_limit.clone());
        Ok(WebhookGateway::new(Arc::new(limiter), Arc::new(validator)))
    }

    /// Builds the HTTP router for `gateway`.
    pub fn router(&self, gateway: WebhookGateway) -> Router {
        let server = &self.config.server;
        let options = WebhookRouteOptions {
            body_limit_bytes: server.body_limit_bytes,
            client_ip_source: if server.trust_forwarded_for {
                ClientIpSource::XForwardedFor
            } else {
                ClientIpSource::ConnectInfo
            },
        };
        let routes = webhook_routes_with_options(gateway, self.sink.clone(), options);

        let base_path = server.base_path.trim_end_matches('/');
        if base_path.is_empty() {
            routes
        } else if base_path.starts_with('/') {
            Router::new().nest(base_path, routes)
        } else {
            Router::new().nest(&format!("/{base_path}"), routes)
        }
    }

    /// Starts the server and serves until the listener fails.
    pub async fn run(&self) -> Result<(), ServerError> {
        let server = &self.config.server;
        let gateway = self.gateway().await?;

        let sweeper = gateway
            .rate_limiter()
            .clone()
            .spawn_sweeper(Duration::from_secs(server.sweep_interval_secs.max(1)));

        let app = self.router(gateway);
        let listener = tokio::net::TcpListener::bind((server.host.as_str(), server.port)).await?;

        tracing::info!(
            addr = %listener.local_addr()?,
            base_path = %server.base_path,
            organizations = self.config.organizations.len(),
            "Starting Hookgate server"
        );

        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
        sweeper.abort();
        result?;
        Ok(())
    }
}

impl Default for WebhookServer {
    fn default() -> Self {
        Self::new(HookgateConfig::default())
    }
}
