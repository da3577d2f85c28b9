//! Station Queue Core
//!
//! Types, wire frames, configuration and pure reorder logic shared by the push
//! channel, the queue reconciler and the command line client.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod api;
pub mod config;
pub mod errors;
pub mod frame;
pub mod reorder;
pub mod status;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use api::QueueApi;
pub use config::{ApiConfig, ChannelConfig, HeartbeatConfig, ReconnectPolicy};
pub use errors::{ApiError, ApiResult, Result, StationqError, TransportError};
pub use frame::{
    ClientFrame, DomainEvent, EntryNotice, FrameData, PushMessage, ServerFrame,
    DEFAULT_SUBSCRIPTIONS,
};
pub use status::ConnectionStatus;
pub use types::{EntryId, QueueEntry, StationId, StationSummary, Timestamp};
