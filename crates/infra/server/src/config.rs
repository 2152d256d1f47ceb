//! Server configuration.

use hookgate_core::{ProviderCredentials, ProviderId};
use hookgate_webhooks::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Host to bind to.
    pub host: String,
    /// Log level, used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Path the webhook routes are nested under.
    pub base_path: String,
    /// Maximum accepted body size in bytes.
    pub body_limit_bytes: usize,
    /// Key rate limiting on the first `X-Forwarded-For` entry instead of
    /// the peer address. Only enable behind a trusted proxy.
    pub trust_forwarded_for: bool,
    /// Interval between idle rate limit counter sweeps, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            host: "0.0.0.0".to_string(),
            log_level: "info".to_string(),
            base_path: "/api/v1/webhooks".to_string(),
            body_limit_bytes: 1024 * 1024,
            trust_forwarded_for: false,
            sweep_interval_secs: 60,
        }
    }
}

/// Credentials per organization, then per provider.
pub type OrganizationCredentials = HashMap<String, HashMap<ProviderId, ProviderCredentials>>;

/// Everything read from a configuration file.
#[derive(Debug, Clone, Default)]
pub struct HookgateConfig {
    /// `[server]` table.
    pub server: ServerConfig,
    /// `[gateway]` table.
    pub gateway: GatewayConfig,
    /// `[organizations.<org>.<provider>]` tables.
    pub organizations: OrganizationCredentials,
}

/// Loads configuration from a TOML file.
pub fn load_config(path: &str) -> Result<HookgateConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
    parse_config(&content)
}

/// Parses configuration from TOML text. Missing tables take their defaults.
pub fn parse_config(content: &str) -> Result<HookgateConfig, ConfigError> {
    let config: toml::Value =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    let server: ServerConfig = section(&config, "server")?.unwrap_or_default();
    let gateway: GatewayConfig = section(&config, "gateway")?.unwrap_or_default();

    let mut organizations = HashMap::new();
    if let Some(orgs_table) = config.get("organizations").and_then(|v| v.as_table()) {
        for (org, providers) in orgs_table {
            let providers_table = providers.as_table().ok_or_else(|| {
                ConfigError::ParseError(format!("organizations.{org} must be a table"))
            })?;

            let mut credentials = HashMap::new();
            for (tag, value) in providers_table {
                let provider = tag
                    .parse::<ProviderId>()
                    .map_err(|e| ConfigError::ParseError(format!("organizations.{org}: {e}")))?;
                let creds: ProviderCredentials = toml::Value::try_into(value.clone())
                    .map_err(|e| ConfigError::ParseError(e.to_string()))?;
                credentials.insert(provider, creds);
            }
            organizations.insert(org.clone(), credentials);
        }
    }

    Ok(HookgateConfig {
        server,
        gateway,
        organizations,
    })
}

fn section<T>(config: &toml::Value, name: &str) -> Result<Option<T>, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    config
        .get(name)
        .map(|v| toml::Value::try_into(v.clone()))
        .transpose()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
