//! stationq CLI Configuration Management
//!
//! Configuration is layered with this priority:
//! 1. Command line arguments (highest)
//! 2. Environment variables (`STATIONQ_*`)
//! 3. Configuration file (`--config`, else `~/.config/stationq/config.toml`)
//! 4. Default values (lowest)

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use stationq_core::{ApiConfig, ChannelConfig, HeartbeatConfig, ReconnectPolicy};

use crate::error::{CliError, Result};

/// Prefix of the environment variables read as configuration
pub const ENV_PREFIX: &str = "STATIONQ_";

/// Environment names (after the prefix) and the keys they set
const ENV_KEYS: [(&str, &str); 3] = [
    ("api_url", "service.api_url"),
    ("ws_url", "service.ws_url"),
    ("token", "service.token"),
];

// ----------------------------------------------------------------------------
// Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the stationq CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub heartbeat: HeartbeatSettings,
    pub reconnect: ReconnectSettings,
}

/// Queue service endpoints and credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// REST base URL
    pub api_url: String,
    /// Push base URL (`ws://` or `wss://`)
    pub ws_url: String,
    /// Bearer token; prefer the environment over writing it to disk
    pub token: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatSettings {
    pub ping_interval_secs: u64,
    pub health_check_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

impl Default for ServiceConfig {
    fn default() -> Self {
        let api = ApiConfig::default();
        Self {
            api_url: api.base_url,
            ws_url: ChannelConfig::default().ws_base_url,
            token: None,
            request_timeout_secs: api.request_timeout.as_secs(),
        }
    }
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        let heartbeat = HeartbeatConfig::default();
        Self {
            ping_interval_secs: heartbeat.ping_interval.as_secs(),
            health_check_interval_secs: heartbeat.health_check_interval.as_secs(),
        }
    }
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        let policy = ReconnectPolicy::default();
        Self {
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            max_attempts: policy.max_attempts,
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load from `path`, or from the default location when it exists
    ///
    /// An explicit path must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_overrides(path, None)
    }

    /// Load with a command line token taking priority over every other layer
    pub fn load_with_overrides(path: Option<&Path>, token: Option<String>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Configuration file not found: {}",
                        path.display()
                    )));
                }
                info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => {
                    info!("Loading configuration from: {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
                _ => info!("Using default configuration"),
            },
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).map(|key| {
            ENV_KEYS
                .iter()
                .find(|(var, _)| key == *var)
                .map_or_else(|| key.into(), |(_, path)| (*path).into())
        }));

        if let Some(token) = token {
            figment = figment.merge(("service.token", token));
        }

        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// `~/.config/stationq/config.toml` on Linux, the platform equivalent elsewhere
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("stationq").join("config.toml"))
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.service.api_url)
            .map_err(|e| CliError::Config(format!("Invalid API URL {}: {e}", self.service.api_url)))?;
        if self.service.request_timeout_secs == 0 {
            return Err(CliError::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        if self.reconnect.max_attempts == 0 {
            return Err(CliError::Config(
                "At least one reconnect attempt must be allowed".to_string(),
            ));
        }
        self.channel_config().validate()?;
        Ok(())
    }

    /// Bearer token, ignoring an empty value
    pub fn token(&self) -> Option<String> {
        self.service.token.clone().filter(|token| !token.is_empty())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.service.api_url.clone(),
            request_timeout: Duration::from_secs(self.service.request_timeout_secs),
        }
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            ws_base_url: self.service.ws_url.clone(),
            heartbeat: HeartbeatConfig {
                ping_interval: Duration::from_secs(self.heartbeat.ping_interval_secs),
                health_check_interval: Duration::from_secs(
                    self.heartbeat.health_check_interval_secs,
                ),
            },
            reconnect: ReconnectPolicy {
                base_delay: Duration::from_millis(self.reconnect.base_delay_ms),
                max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
                max_attempts: self.reconnect.max_attempts,
            },
            ..ChannelConfig::default()
        }
    }
}
