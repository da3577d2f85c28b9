//! Inbound frame classification
//!
//! Heartbeat answers and subscription acknowledgements are consumed by the
//! channel. Everything else is forwarded to the consumer exactly as received,
//! with a typed [`ServerFrame`] attached when the frame decodes.

use serde_json::Value;
use tracing::{debug, warn};

use stationq_core::frame::{PONG, SUBSCRIPTION_CONFIRMED};
use stationq_core::{PushMessage, ServerFrame, StationId};

/// Routing decision for one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Heartbeat answer for the monitor
    Pong,
    /// Acknowledgement logged and dropped
    Housekeeping,
    /// Frame for the consumer
    Forward(PushMessage),
}

/// Classifies frames arriving on one station channel
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    station: StationId,
}

impl EventDispatcher {
    pub fn new(station: StationId) -> Self {
        Self { station }
    }

    pub fn dispatch(&self, raw: String) -> Dispatch {
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => {
                warn!(station = %self.station, %error, "Failed to parse push frame, forwarding raw");
                return Dispatch::Forward(PushMessage::undecoded(raw));
            }
        };

        match value.get("type").and_then(Value::as_str) {
            Some(PONG) => Dispatch::Pong,
            Some(SUBSCRIPTION_CONFIRMED) => {
                debug!(station = %self.station, events = ?value.get("events"), "Subscription confirmed");
                Dispatch::Housekeeping
            }
            _ => match serde_json::from_value::<ServerFrame>(value) {
                Ok(frame) => {
                    debug!(station = %self.station, kind = frame.type_name(), "Push frame received");
                    Dispatch::Forward(PushMessage {
                        raw,
                        frame: Some(frame),
                    })
                }
                Err(error) => {
                    warn!(station = %self.station, %error, "Unrecognised push frame, forwarding raw");
                    Dispatch::Forward(PushMessage::undecoded(raw))
                }
            },
        }
    }
}
