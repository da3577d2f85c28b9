//! In-memory connector for tests and local tooling
//!
//! Every accepted connection yields a [`MemoryPeer`] on the [`MemoryListener`],
//! which plays the push service: it pushes frames, reads client frames and
//! closes or silently kills the link.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use stationq_core::TransportError;

use crate::connector::{Connector, Link, WireEvent};

// ----------------------------------------------------------------------------
// Connector
// ----------------------------------------------------------------------------

struct MemoryState {
    accepting: bool,
    attempts: Vec<Instant>,
}

/// Connector whose links are driven by a [`MemoryListener`]
#[derive(Clone)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

/// Receives the service side of each accepted connection
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryConnector {
    pub fn new() -> (Self, MemoryListener) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            state: Arc::new(Mutex::new(MemoryState {
                accepting: true,
                attempts: Vec::new(),
            })),
            peers,
        };
        (connector, MemoryListener { peers: rx })
    }

    /// Refuse (`false`) or accept (`true`) subsequent connection attempts
    pub fn set_accepting(&self, accepting: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.accepting = accepting;
        }
    }

    /// Instants of every connection attempt so far
    pub fn attempts(&self) -> Vec<Instant> {
        self.state
            .lock()
            .map(|state| state.attempts.clone())
            .unwrap_or_default()
    }

    fn admit(&self) -> bool {
        match self.state.lock() {
            Ok(mut state) => {
                state.attempts.push(Instant::now());
                state.accepting
            }
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Link>, TransportError> {
        let refused = || TransportError::ConnectionFailed {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        };
        if !self.admit() {
            return Err(refused());
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));
        let peer = MemoryPeer {
            url: url.clone(),
            to_client,
            from_client,
            open: open.clone(),
        };
        self.peers.send(peer).map_err(|_| refused())?;

        Ok(Box::new(MemoryLink {
            inbound,
            outbound,
            open,
        }))
    }
}

impl MemoryListener {
    /// Next accepted connection
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }
}

// ----------------------------------------------------------------------------
// Link Ends
// ----------------------------------------------------------------------------

struct MemoryLink {
    inbound: mpsc::UnboundedReceiver<WireEvent>,
    outbound: mpsc::UnboundedSender<String>,
    open: Arc<AtomicBool>,
}

#[async_trait]
impl Link for MemoryLink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::SendFailed {
                reason: "connection closed".to_string(),
            });
        }
        self.outbound
            .send(text)
            .map_err(|_| TransportError::SendFailed {
                reason: "peer gone".to_string(),
            })
    }

    async fn next_event(&mut self) -> WireEvent {
        match self.inbound.recv().await {
            Some(WireEvent::Closed(reason)) => {
                self.open.store(false, Ordering::SeqCst);
                WireEvent::Closed(reason)
            }
            Some(event) => event,
            None => {
                self.open.store(false, Ordering::SeqCst);
                WireEvent::Closed(None)
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Service side of an in-memory connection
pub struct MemoryPeer {
    pub url: Url,
    to_client: mpsc::UnboundedSender<WireEvent>,
    from_client: mpsc::UnboundedReceiver<String>,
    open: Arc<AtomicBool>,
}

impl MemoryPeer {
    /// Push a text frame to the client
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.to_client.send(WireEvent::Text(text.into()));
    }

    /// Push a JSON frame to the client
    pub fn push_json(&self, value: &Value) {
        self.push(value.to_string());
    }

    /// Report a read failure to the client
    pub fn fail(&self, error: TransportError) {
        let _ = self.to_client.send(WireEvent::Error(error));
    }

    /// Close the connection from the service side
    pub fn close(&self) {
        let _ = self.to_client.send(WireEvent::Closed(None));
    }

    /// Mark the link dead without notifying the client
    pub fn kill_silently(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Whether the client still considers the link open
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Next raw frame sent by the client
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Next frame sent by the client, decoded as JSON
    pub async fn recv_json(&mut self) -> Option<Value> {
        let text = self.recv().await?;
        serde_json::from_str(&text).ok()
    }

    /// Frames already sent by the client, without waiting
    pub fn drain(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(text) = self.from_client.try_recv() {
            frames.push(text);
        }
        frames
    }
}
