//! Application configuration.

use crate::error::{ServerError, ServerResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port. Default: 8080.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Price sync loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between sync ticks (seconds). Default: 30.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Ceiling for the post-create finalize poll (seconds). Default: 60.
    #[serde(default = "default_create_poll_timeout_secs")]
    pub create_poll_timeout_secs: u64,
    /// Interval between post-create finalize polls (seconds). Default: 2.
    #[serde(default = "default_create_poll_interval_secs")]
    pub create_poll_interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    30
}

fn default_create_poll_timeout_secs() -> u64 {
    60
}

fn default_create_poll_interval_secs() -> u64 {
    2
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            create_poll_timeout_secs: default_create_poll_timeout_secs(),
            create_poll_interval_secs: default_create_poll_interval_secs(),
        }
    }
}

/// Pricing defaults applied to new routes that do not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Access price = source price * multiplier. Default: 1.
    #[serde(default = "default_multiplier")]
    pub default_multiplier: Decimal,
    /// Starting market cap passed to the provisioning collaborator.
    /// Default: "1000000".
    #[serde(default = "default_market_cap")]
    pub default_market_cap: String,
}

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

fn default_market_cap() -> String {
    "1000000".to_string()
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_multiplier: default_multiplier(),
            default_market_cap: default_market_cap(),
        }
    }
}

/// Proxy gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Upstream forward timeout (seconds). Default: 30.
    #[serde(default = "default_proxy_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_proxy_timeout_secs() -> u64 {
    30
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_proxy_timeout_secs(),
        }
    }
}

/// Routes file persistence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the JSON routes file. `None` disables persistence.
    #[serde(default)]
    pub routes_file: Option<PathBuf>,
}

/// Transcript-to-market matching demo configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Whether the transcript endpoint is served. Default: false.
    #[serde(default)]
    pub enabled: bool,
    /// Chat-completions endpoint.
    #[serde(default = "default_chat_api_url")]
    pub chat_api_url: String,
    /// Model identifier passed to the chat endpoint.
    #[serde(default = "default_model")]
    pub model: String,
    /// Market catalog URL.
    #[serde(default = "default_markets_url")]
    pub markets_url: String,
    /// Notification webhook. `None` disables notifications.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_chat_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_markets_url() -> String {
    "https://gamma-api.polymarket.com/markets?closed=false&limit=100".to_string()
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chat_api_url: default_chat_api_url(),
            model: default_model(),
            markets_url: default_markets_url(),
            webhook_url: None,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Network identifier forwarded to both collaborators. Default: "base".
    #[serde(default = "default_network")]
    pub network: String,
    /// Base URL of the provisioning (asset launch) collaborator.
    #[serde(default = "default_launch_api_url")]
    pub launch_api_url: String,
    /// Base URL of the price data collaborator.
    #[serde(default = "default_data_api_url")]
    pub data_api_url: String,
    /// Price sync loop settings.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Pricing defaults.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Proxy gateway settings.
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// Routes file persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Transcript demo settings.
    #[serde(default)]
    pub transcript: TranscriptConfig,
}

fn default_network() -> String {
    "base".to_string()
}

fn default_launch_api_url() -> String {
    "https://web2-api.flaunch.gg/v1".to_string()
}

fn default_data_api_url() -> String {
    "https://web2-api.flaunch.gg/v1".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            network: default_network(),
            launch_api_url: default_launch_api_url(),
            data_api_url: default_data_api_url(),
            sync: SyncConfig::default(),
            pricing: PricingConfig::default(),
            proxy: ProxyConfig::default(),
            persistence: PersistenceConfig::default(),
            transcript: TranscriptConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file.
    pub fn load() -> ServerResult<Self> {
        let config_path =
            std::env::var("TOLLGATE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| ServerError::Config(format!("Failed to parse config: {e}")))
    }
}
