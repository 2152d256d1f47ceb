//! Hookgate server binary.

use hookgate_server::{load_config, HookgateConfig, WebhookServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // First argument, then HOOKGATE_CONFIG, then defaults
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HOOKGATE_CONFIG").ok());
    let config = match &path {
        Some(path) => load_config(path)?,
        None => HookgateConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    if path.is_none() {
        tracing::warn!("No configuration file given, no organization can be verified");
    }

    let server = WebhookServer::new(config);
    server.run().await?;

    Ok(())
}
