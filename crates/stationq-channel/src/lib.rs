//! Station Queue Push Channel
//!
//! Persistent push connection for one station queue: connection lifecycle,
//! heartbeat and latency measurement, bounded reconnect backoff, event
//! subscription and inbound frame dispatch.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod channel;
pub mod connector;
pub mod dispatcher;
pub mod handlers;
pub mod heartbeat;
pub mod memory;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use channel::{endpoint, ChannelCredentials, ChannelHandle, QueueChannel};
pub use connector::{Connector, Link, WireEvent, WsConnector};
pub use dispatcher::{Dispatch, EventDispatcher};
pub use handlers::ChannelHandlers;
pub use heartbeat::{HeartbeatMonitor, HeartbeatTick};
pub use memory::{MemoryConnector, MemoryListener, MemoryPeer};
