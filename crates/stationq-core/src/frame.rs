//! Push channel wire frames
//!
//! Outbound frames are a serde internally tagged enum. Inbound frames are decoded
//! through a permissive raw shape and then narrowed into [`ServerFrame`], a sum
//! type with one variant per frame shape; unrecognised `type` values fail to
//! decode so callers can log them instead of guessing at their structure.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{EntryId, QueueEntry, StationId};

// ----------------------------------------------------------------------------
// Event Names
// ----------------------------------------------------------------------------

/// Events every channel subscribes to on (re)connect
pub const DEFAULT_SUBSCRIPTIONS: [&str; 7] = [
    "queue_updated",
    "queue_entry_added",
    "queue_entry_removed",
    "queue_entry_updated",
    "queue_reordered",
    "day_pass_created",
    "exit_pass_created",
];

/// Frame type answering a ping
pub const PONG: &str = "pong";

/// Frame type acknowledging a subscribe request
pub const SUBSCRIPTION_CONFIRMED: &str = "subscription_confirmed";

/// Domain events pushed by the queue service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainEvent {
    QueueUpdated,
    QueueEntryAdded,
    QueueEntryRemoved,
    QueueEntryUpdated,
    QueueReordered,
    DayPassCreated,
    ExitPassCreated,
}

impl DomainEvent {
    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainEvent::QueueUpdated => "queue_updated",
            DomainEvent::QueueEntryAdded => "queue_entry_added",
            DomainEvent::QueueEntryRemoved => "queue_entry_removed",
            DomainEvent::QueueEntryUpdated => "queue_entry_updated",
            DomainEvent::QueueReordered => "queue_reordered",
            DomainEvent::DayPassCreated => "day_pass_created",
            DomainEvent::ExitPassCreated => "exit_pass_created",
        }
    }

    /// Whether the event concerns queue contents (`queue_*` family)
    pub fn is_queue_event(&self) -> bool {
        self.as_str().contains("queue_")
    }
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainEvent {
    type Err = UnknownFrameType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queue_updated" => Ok(DomainEvent::QueueUpdated),
            "queue_entry_added" => Ok(DomainEvent::QueueEntryAdded),
            "queue_entry_removed" => Ok(DomainEvent::QueueEntryRemoved),
            "queue_entry_updated" => Ok(DomainEvent::QueueEntryUpdated),
            "queue_reordered" => Ok(DomainEvent::QueueReordered),
            "day_pass_created" => Ok(DomainEvent::DayPassCreated),
            "exit_pass_created" => Ok(DomainEvent::ExitPassCreated),
            other => Err(UnknownFrameType(other.to_string())),
        }
    }
}

/// A frame `type` this client does not recognise
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown frame type: {0}")]
pub struct UnknownFrameType(pub String);

// ----------------------------------------------------------------------------
// Outbound Frames
// ----------------------------------------------------------------------------

/// Frames the client sends to the push service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Ping,
    Subscribe { events: Vec<String> },
    Unsubscribe { events: Vec<String> },
}

// ----------------------------------------------------------------------------
// Inbound Frames
// ----------------------------------------------------------------------------

/// Entry reference carried by `queue_entry_*` notifications
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryNotice {
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(default, alias = "stationId")]
    pub destination_id: Option<StationId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload of a domain frame
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameData {
    /// Complete replacement list, present on snapshot-style frames
    #[serde(default)]
    pub queue: Option<Vec<QueueEntry>>,
    #[serde(default)]
    pub entry: Option<EntryNotice>,
    #[serde(default, alias = "destinationId")]
    pub station_id: Option<StationId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawServerFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<FrameData>,
    #[serde(default)]
    events: Option<Vec<String>>,
}

/// Frames received from the push service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawServerFrame")]
pub enum ServerFrame {
    /// Heartbeat answer
    Pong,
    /// Subscription acknowledgement
    SubscriptionConfirmed { events: Vec<String> },
    /// Queue or pass event for consumers
    Domain { event: DomainEvent, data: FrameData },
}

impl TryFrom<RawServerFrame> for ServerFrame {
    type Error = UnknownFrameType;

    fn try_from(raw: RawServerFrame) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            PONG => Ok(ServerFrame::Pong),
            SUBSCRIPTION_CONFIRMED => Ok(ServerFrame::SubscriptionConfirmed {
                events: raw.events.unwrap_or_default(),
            }),
            other => Ok(ServerFrame::Domain {
                event: other.parse()?,
                data: raw.data.unwrap_or_default(),
            }),
        }
    }
}

impl ServerFrame {
    /// Wire name of the frame type
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerFrame::Pong => PONG,
            ServerFrame::SubscriptionConfirmed { .. } => SUBSCRIPTION_CONFIRMED,
            ServerFrame::Domain { event, .. } => event.as_str(),
        }
    }

    /// Domain event carried by this frame, if any
    pub fn event(&self) -> Option<DomainEvent> {
        match self {
            ServerFrame::Domain { event, .. } => Some(*event),
            _ => None,
        }
    }

    /// Full replacement list embedded in a snapshot frame
    pub fn embedded_queue(&self) -> Option<&[QueueEntry]> {
        match self {
            ServerFrame::Domain { data, .. } => data.queue.as_deref(),
            _ => None,
        }
    }

    /// Station the frame's entry belongs to
    pub fn destination(&self) -> Option<&StationId> {
        match self {
            ServerFrame::Domain { data, .. } => data
                .entry
                .as_ref()
                .and_then(|entry| entry.destination_id.as_ref())
                .or(data.station_id.as_ref()),
            _ => None,
        }
    }
}

/// A frame forwarded to the consumer
///
/// `raw` is the text exactly as received. `frame` is `None` when the text is
/// not JSON or names a type this client does not know.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub raw: String,
    pub frame: Option<ServerFrame>,
}

impl PushMessage {
    /// Wrap a raw frame that could not be decoded
    pub fn undecoded(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            frame: None,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_frames_wire_format() {
        assert_eq!(
            serde_json::to_value(ClientFrame::Ping).unwrap(),
            json!({"type": "ping"})
        );
        assert_eq!(
            serde_json::to_value(ClientFrame::Unsubscribe {
                events: vec!["queue_updated".into()]
            })
            .unwrap(),
            json!({"type": "unsubscribe", "events": ["queue_updated"]})
        );
    }

    #[test]
    fn test_subscribe_defaults() {
        let events = DEFAULT_SUBSCRIPTIONS.iter().map(|e| e.to_string()).collect();
        let value = serde_json::to_value(ClientFrame::Subscribe { events }).unwrap();
        assert_eq!(value["type"], "subscribe");
        assert_eq!(value["events"].as_array().unwrap().len(), 7);
        assert_eq!(value["events"][4], "queue_reordered");
    }

    #[test]
    fn test_housekeeping_frames() {
        let pong: ServerFrame = serde_json::from_str(r#"{"type":"pong","ts":12}"#).unwrap();
        assert_eq!(pong, ServerFrame::Pong);

        let confirmed: ServerFrame =
            serde_json::from_str(r#"{"type":"subscription_confirmed","events":["queue_updated"]}"#)
                .unwrap();
        assert_eq!(
            confirmed,
            ServerFrame::SubscriptionConfirmed {
                events: vec!["queue_updated".to_string()]
            }
        );
    }

    #[test]
    fn test_snapshot_frame() {
        let frame: ServerFrame = serde_json::from_value(json!({
            "type": "queue_updated",
            "data": {"queue": [{"id": "a", "queuePosition": 1}, {"id": "b", "queuePosition": 2}]}
        }))
        .unwrap();

        assert_eq!(frame.event(), Some(DomainEvent::QueueUpdated));
        let queue = frame.embedded_queue().unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[1].id, EntryId::from("b"));
    }

    #[test]
    fn test_entry_notification_destination() {
        let frame: ServerFrame = serde_json::from_value(json!({
            "type": "queue_entry_removed",
            "data": {"entry": {"id": "x", "destinationId": "sousse", "licensePlate": "1 TU 1"}}
        }))
        .unwrap();

        assert!(frame.embedded_queue().is_none());
        assert_eq!(frame.destination(), Some(&StationId::from("sousse")));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = serde_json::from_str::<ServerFrame>(r#"{"type":"vehicle_teleported"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_queue_event_family() {
        assert!(DomainEvent::QueueReordered.is_queue_event());
        assert!(DomainEvent::QueueEntryAdded.is_queue_event());
        assert!(!DomainEvent::DayPassCreated.is_queue_event());
        assert_eq!("exit_pass_created".parse(), Ok(DomainEvent::ExitPassCreated));
    }
}
