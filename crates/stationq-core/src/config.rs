//! Configuration for the push channel and the REST collaborator

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{Result, StationqError};
use crate::frame::DEFAULT_SUBSCRIPTIONS;

// ----------------------------------------------------------------------------
// Heartbeat Configuration
// ----------------------------------------------------------------------------

/// Heartbeat timer periods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Interval between pings while connected
    pub ping_interval: Duration,
    /// Interval between connection liveness checks
    pub health_check_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            health_check_interval: Duration::from_secs(10),
        }
    }
}

// ----------------------------------------------------------------------------
// Reconnect Policy
// ----------------------------------------------------------------------------

/// Bounded exponential backoff for re-establishing a dropped connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay unit doubled on every attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Consecutive attempts before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given attempt (counted from 1): `min(base * 2^attempt, max)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Whether another attempt is allowed after `attempts` consecutive failures
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Configuration for a station push channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Push service base URL (`ws://` or `wss://`)
    pub ws_base_url: String,
    pub heartbeat: HeartbeatConfig,
    pub reconnect: ReconnectPolicy,
    /// Events subscribed on every (re)connect
    pub subscriptions: Vec<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ws_base_url: "wss://queue.example.com".to_string(),
            heartbeat: HeartbeatConfig::default(),
            reconnect: ReconnectPolicy::default(),
            subscriptions: DEFAULT_SUBSCRIPTIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl ChannelConfig {
    /// Create a configuration for a push service running on this machine
    pub fn local_development() -> Self {
        Self {
            ws_base_url: "ws://localhost:3001".to_string(),
            ..Self::default()
        }
    }

    /// Create a configuration pointing at the given push service
    pub fn with_base_url(ws_base_url: impl Into<String>) -> Self {
        Self {
            ws_base_url: ws_base_url.into(),
            ..Self::default()
        }
    }

    /// Check the configuration before opening a channel
    pub fn validate(&self) -> Result<()> {
        if !(self.ws_base_url.starts_with("ws://") || self.ws_base_url.starts_with("wss://")) {
            return Err(StationqError::config_error(format!(
                "push URL must use ws:// or wss://, got {}",
                self.ws_base_url
            )));
        }
        if self.heartbeat.ping_interval.is_zero() || self.heartbeat.health_check_interval.is_zero()
        {
            return Err(StationqError::config_error("heartbeat intervals must be non-zero"));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// API Configuration
// ----------------------------------------------------------------------------

/// Configuration for the REST collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST service base URL
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://queue.example.com".to_string(),
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl ApiConfig {
    /// Create a configuration for a REST service running on this machine
    pub fn local_development() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }

    /// Create a configuration pointing at the given REST service
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u128> = (1..=5).map(|a| policy.delay_for(a).as_millis()).collect();
        assert_eq!(delays, vec![2000, 4000, 8000, 16000, 30000]);
        assert!(policy.allows(4));
        assert!(!policy.allows(5));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(40), Duration::from_millis(30_000));
    }

    #[test]
    fn test_channel_config_validation() {
        assert!(ChannelConfig::local_development().validate().is_ok());
        assert!(ChannelConfig::with_base_url("http://localhost").validate().is_err());

        let mut config = ChannelConfig::default();
        config.heartbeat.ping_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_subscriptions() {
        let config = ChannelConfig::default();
        assert_eq!(config.subscriptions.len(), 7);
        assert_eq!(config.subscriptions[0], "queue_updated");
    }
}
