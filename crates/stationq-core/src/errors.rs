//! Error types for station queue synchronisation
//!
//! Specific error enums for the push transport and the REST collaborator are
//! unified under [`StationqError`], which also carries the reconciler's own
//! rejection cases.

use crate::types::{EntryId, StationId};

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Push transport failures
///
/// These never reach consumers as operation failures; they are reported through
/// the channel's error callback and recovered by the reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection to {url} failed: {reason}")]
    ConnectionFailed { url: String, reason: String },
    #[error("Send failed: {reason}")]
    SendFailed { reason: String },
    #[error("Receive failed: {reason}")]
    ReceiveFailed { reason: String },
    #[error("Invalid push endpoint: {reason}")]
    InvalidEndpoint { reason: String },
}

/// REST collaborator failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Server responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Request failed: {reason}")]
    Request { reason: String },
    #[error("Response decoding failed: {reason}")]
    Decode { reason: String },
}

impl ApiError {
    /// Whether the server reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Errors surfaced by the station queue crates
#[derive(Debug, thiserror::Error)]
pub enum StationqError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    /// Reorder was rejected; the visible order has been reset from the server
    #[error("Reorder of station {station} rejected: {source}")]
    ReorderRejected {
        station: StationId,
        #[source]
        source: ApiError,
    },
    /// Delete was rejected; the visible order is unchanged
    #[error("Delete of entry {entry} rejected: {source}")]
    DeleteRejected {
        entry: EntryId,
        #[source]
        source: ApiError,
    },
    #[error("Invalid move {from} -> {to} in a queue of {len}")]
    InvalidMove { from: usize, to: usize, len: usize },
    #[error("Entry not found: {entry}")]
    EntryNotFound { entry: EntryId },
    #[error("No station selected")]
    NoStationSelected,
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl StationqError {
    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        StationqError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an invalid move error
    pub fn invalid_move(from: usize, to: usize, len: usize) -> Self {
        StationqError::InvalidMove { from, to, len }
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, StationqError>;
pub type ApiResult<T> = core::result::Result<T, ApiError>;
