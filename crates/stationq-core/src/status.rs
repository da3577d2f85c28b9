//! Connection status reported by a push channel

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Health of a station push channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    /// Last measured ping round trip, kept across reconnects
    pub latency_ms: u64,
    /// Last time the channel opened or delivered a message
    pub last_update: Option<Timestamp>,
    /// Set once reconnect attempts are exhausted
    pub gave_up: bool,
}

impl ConnectionStatus {
    pub fn connected(latency_ms: u64) -> Self {
        Self {
            connected: true,
            latency_ms,
            ..Self::default()
        }
    }

    pub fn disconnected(latency_ms: u64) -> Self {
        Self {
            connected: false,
            latency_ms,
            ..Self::default()
        }
    }

    /// Disconnected with no further automatic attempts
    pub fn exhausted(latency_ms: u64) -> Self {
        Self {
            gave_up: true,
            ..Self::disconnected(latency_ms)
        }
    }
}
