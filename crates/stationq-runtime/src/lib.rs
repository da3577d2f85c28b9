//! Station Queue Runtime
//!
//! Reconciles the visible station queue with the server, binds it to the push
//! channel and provides the HTTP implementation of the queue service API.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod http;
pub mod reconciler;
pub mod session;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use http::HttpQueueApi;
pub use reconciler::{PushOutcome, QueueSnapshot, Reconciler};
pub use session::StationSession;
