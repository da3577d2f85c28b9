//! Consumer callbacks for push channel lifecycle and messages
//!
//! All handlers are optional and registered through a builder. They run on the
//! channel task, so they should hand work off rather than block.

use std::fmt;
use std::sync::Arc;

use stationq_core::{ConnectionStatus, PushMessage, TransportError};

pub type OnOpenCallback = Arc<dyn Fn() + Send + Sync>;
pub type OnCloseCallback = Arc<dyn Fn() + Send + Sync>;
pub type OnErrorCallback = Arc<dyn Fn(&TransportError) + Send + Sync>;
pub type OnMessageCallback = Arc<dyn Fn(PushMessage) + Send + Sync>;
pub type OnStatusCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Callbacks invoked by a push channel
#[derive(Clone, Default)]
pub struct ChannelHandlers {
    on_open: Option<OnOpenCallback>,
    on_close: Option<OnCloseCallback>,
    on_error: Option<OnErrorCallback>,
    on_message: Option<OnMessageCallback>,
    on_connection_status: Option<OnStatusCallback>,
}

impl fmt::Debug for ChannelHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandlers")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_connection_status", &self.on_connection_status.is_some())
            .finish()
    }
}

impl ChannelHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called each time a connection is established
    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(f));
        self
    }

    /// Called each time a connection closes or fails to open
    pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    /// Called on transport errors
    pub fn on_error(mut self, f: impl Fn(&TransportError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Called for every frame not consumed by the channel itself
    pub fn on_message(mut self, f: impl Fn(PushMessage) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Called whenever connectivity or latency changes
    pub fn on_connection_status(
        mut self,
        f: impl Fn(ConnectionStatus) + Send + Sync + 'static,
    ) -> Self {
        self.on_connection_status = Some(Arc::new(f));
        self
    }

    // ------------------------------------------------------------------------
    // Invocation
    // ------------------------------------------------------------------------

    pub(crate) fn open(&self) {
        if let Some(f) = &self.on_open {
            f();
        }
    }

    pub(crate) fn close(&self) {
        if let Some(f) = &self.on_close {
            f();
        }
    }

    pub(crate) fn error(&self, error: &TransportError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }

    pub(crate) fn message(&self, message: PushMessage) {
        if let Some(f) = &self.on_message {
            f(message);
        }
    }

    pub(crate) fn status(&self, status: ConnectionStatus) {
        if let Some(f) = &self.on_connection_status {
            f(status);
        }
    }
}
