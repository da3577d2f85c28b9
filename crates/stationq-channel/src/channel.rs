//! Station push channel
//!
//! One actor task per station owns the live connection and the heartbeat
//! timers. The [`ChannelHandle`] returned by [`QueueChannel::open`] talks to it
//! over an unbounded command channel.
//!
//! Lifecycle:
//! - on open: reset the attempt counter, report connected, start the
//!   heartbeat and subscribe to the configured events
//! - on close: report disconnected, stop the heartbeat, then retry with
//!   bounded exponential backoff unless the caller disconnected
//! - after the last attempt: report `gave_up` once and wait for
//!   [`ChannelHandle::reconnect`] or [`ChannelHandle::disconnect`]
//! - a health check that finds the link dead reconnects immediately

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use stationq_core::{
    ChannelConfig, ClientFrame, ConnectionStatus, Result, StationId, StationqError,
    TransportError,
};

use crate::connector::{redact, Connector, Link, WireEvent, WsConnector};
use crate::dispatcher::{Dispatch, EventDispatcher};
use crate::handlers::ChannelHandlers;
use crate::heartbeat::{HeartbeatMonitor, HeartbeatTick};

// ----------------------------------------------------------------------------
// Credentials and Endpoint
// ----------------------------------------------------------------------------

/// Credentials presented when opening a channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelCredentials {
    pub token: Option<String>,
}

impl ChannelCredentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Build `{base}/ws/queue/{station}?token={token}`
pub fn endpoint(base: &str, station: &StationId, token: Option<&str>) -> Result<Url> {
    let invalid = |reason: String| {
        StationqError::Transport(TransportError::InvalidEndpoint { reason })
    };
    let mut url = Url::parse(base).map_err(|e| invalid(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("{base} cannot carry a path")))?
        .pop_if_empty()
        .extend(["ws", "queue", station.as_str()]);
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url)
}

// ----------------------------------------------------------------------------
// Channel Handle
// ----------------------------------------------------------------------------

#[derive(Debug)]
enum Command {
    Send(String),
    Reconnect,
    Disconnect,
}

#[derive(Debug, Default)]
struct ChannelShared {
    connected: AtomicBool,
    latency_ms: AtomicU64,
}

/// Entry point for opening station channels
pub struct QueueChannel;

impl QueueChannel {
    /// Open a WebSocket channel for `station`
    pub fn open(
        station: StationId,
        config: ChannelConfig,
        credentials: ChannelCredentials,
        handlers: ChannelHandlers,
    ) -> Result<ChannelHandle> {
        Self::open_with(Arc::new(WsConnector), station, config, credentials, handlers)
    }

    /// Open a channel over a custom connector
    pub fn open_with(
        connector: Arc<dyn Connector>,
        station: StationId,
        config: ChannelConfig,
        credentials: ChannelCredentials,
        handlers: ChannelHandlers,
    ) -> Result<ChannelHandle> {
        config.validate()?;
        let url = endpoint(&config.ws_base_url, &station, credentials.token.as_deref())?;
        let (commands, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(ChannelShared::default());

        let actor = ChannelActor {
            station: station.clone(),
            url,
            connector,
            dispatcher: EventDispatcher::new(station.clone()),
            heartbeat: HeartbeatMonitor::new(config.heartbeat.clone()),
            config,
            handlers,
            commands: receiver,
            shared: shared.clone(),
            attempts: 0,
        };
        let task = tokio::spawn(actor.run());

        Ok(ChannelHandle {
            station,
            commands,
            shared,
            task: Some(task),
        })
    }
}

/// Caller side of a station channel; dropping it disconnects
pub struct ChannelHandle {
    station: StationId,
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<ChannelShared>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    pub fn station(&self) -> &StationId {
        &self.station
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Last measured ping round trip
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.shared.latency_ms.load(Ordering::SeqCst))
    }

    /// Send any JSON-serialisable message; dropped when not connected
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) {
        match serde_json::to_string(message) {
            Ok(text) => self.send_text(text),
            Err(e) => warn!(station = %self.station, error = %e, "Dropping unserialisable message"),
        }
    }

    fn send_text(&self, text: String) {
        if !self.is_connected() {
            debug!(station = %self.station, "Not connected, dropping outbound message");
            return;
        }
        let _ = self.commands.send(Command::Send(text));
    }

    pub fn subscribe(&self, events: Vec<String>) {
        self.send(&ClientFrame::Subscribe { events });
    }

    pub fn unsubscribe(&self, events: Vec<String>) {
        self.send(&ClientFrame::Unsubscribe { events });
    }

    /// Re-open after retries were exhausted, or cut a pending backoff short
    pub fn reconnect(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Close the channel and stop reconnecting (idempotent)
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Wait for the channel task to finish after [`Self::disconnect`]
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(station = %self.station, error = %e, "Channel task failed");
            }
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ----------------------------------------------------------------------------
// Channel Actor
// ----------------------------------------------------------------------------

enum SessionEnd {
    /// Caller disconnected or every handle is gone
    Disconnected,
    /// Closed by the service or the network
    Dropped,
    /// Health check found the link dead
    Stale,
}

struct ChannelActor {
    station: StationId,
    url: Url,
    connector: Arc<dyn Connector>,
    config: ChannelConfig,
    handlers: ChannelHandlers,
    dispatcher: EventDispatcher,
    heartbeat: HeartbeatMonitor,
    commands: mpsc::UnboundedReceiver<Command>,
    shared: Arc<ChannelShared>,
    attempts: u32,
}

impl ChannelActor {
    async fn run(mut self) {
        info!(station = %self.station, url = %redact(&self.url), "Push channel starting");

        loop {
            let Some(result) = self.connect().await else {
                break;
            };
            match result {
                Ok(link) => {
                    self.attempts = 0;
                    match self.session(link).await {
                        SessionEnd::Disconnected => break,
                        SessionEnd::Stale => continue,
                        SessionEnd::Dropped => {}
                    }
                }
                Err(e) => {
                    warn!(station = %self.station, error = %e, "Push channel connect failed");
                    self.handlers.error(&e);
                    self.report_closed();
                }
            }
            if !self.backoff().await {
                break;
            }
        }

        self.shared.connected.store(false, Ordering::SeqCst);
        self.heartbeat.stop();
        info!(station = %self.station, "Push channel stopped");
    }

    /// Connect while staying responsive to disconnect; `None` means stop
    async fn connect(&mut self) -> Option<std::result::Result<Box<dyn Link>, TransportError>> {
        let connector = self.connector.clone();
        let url = self.url.clone();
        let connecting = connector.connect(&url);
        tokio::pin!(connecting);

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Disconnect) | None => return None,
                    Some(other) => debug!(station = %self.station, ?other, "Connecting, dropping command"),
                },
                result = &mut connecting => return Some(result),
            }
        }
    }

    /// Wait out the next reconnect delay; `false` means stop
    async fn backoff(&mut self) -> bool {
        let policy = self.config.reconnect.clone();
        if !policy.allows(self.attempts) {
            warn!(
                station = %self.station,
                attempts = self.attempts,
                "Reconnect attempts exhausted, waiting for explicit reconnect"
            );
            self.handlers
                .status(ConnectionStatus::exhausted(self.heartbeat.latency_ms()));
            return self.idle().await;
        }

        self.attempts += 1;
        let delay = policy.delay_for(self.attempts);
        info!(
            station = %self.station,
            attempt = self.attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Disconnect) | None => return false,
                    Some(Command::Reconnect) => {
                        self.attempts = 0;
                        return true;
                    }
                    Some(other) => debug!(station = %self.station, ?other, "Not connected, dropping command"),
                },
                _ = &mut sleep => return true,
            }
        }
    }

    /// Idle after exhaustion until reconnect (`true`) or disconnect (`false`)
    async fn idle(&mut self) -> bool {
        loop {
            match self.commands.recv().await {
                Some(Command::Reconnect) => {
                    info!(station = %self.station, "Explicit reconnect requested");
                    self.attempts = 0;
                    return true;
                }
                Some(Command::Disconnect) | None => return false,
                Some(other) => debug!(station = %self.station, ?other, "Not connected, dropping command"),
            }
        }
    }

    async fn session(&mut self, mut link: Box<dyn Link>) -> SessionEnd {
        self.shared.connected.store(true, Ordering::SeqCst);
        info!(station = %self.station, "Push channel open");
        self.handlers.open();
        self.handlers
            .status(ConnectionStatus::connected(self.heartbeat.latency_ms()));
        self.heartbeat.start();

        let subscribe = ClientFrame::Subscribe {
            events: self.config.subscriptions.clone(),
        };
        self.send_frame(link.as_mut(), &subscribe).await;

        let end = loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Send(text)) => {
                        self.send_text(link.as_mut(), text).await;
                    }
                    Some(Command::Reconnect) => debug!(station = %self.station, "Already connected"),
                    Some(Command::Disconnect) | None => {
                        link.close().await;
                        break SessionEnd::Disconnected;
                    }
                },
                tick = self.heartbeat.next_tick() => match tick {
                    HeartbeatTick::Ping => {
                        if self.send_frame(link.as_mut(), &ClientFrame::Ping).await {
                            self.heartbeat.record_ping();
                        }
                    }
                    HeartbeatTick::HealthCheck => {
                        if !link.is_open() {
                            warn!(station = %self.station, "Health check found connection dead, reconnecting");
                            link.close().await;
                            break SessionEnd::Stale;
                        }
                    }
                },
                event = link.next_event() => match event {
                    WireEvent::Text(text) => self.dispatch(text),
                    WireEvent::Error(e) => {
                        warn!(station = %self.station, error = %e, "Push channel error");
                        self.handlers.error(&e);
                    }
                    WireEvent::Closed(reason) => {
                        info!(station = %self.station, reason = ?reason, "Push channel closed by peer");
                        break SessionEnd::Dropped;
                    }
                },
            }
        };

        self.report_closed();
        end
    }

    fn dispatch(&mut self, text: String) {
        match self.dispatcher.dispatch(text) {
            Dispatch::Pong => match self.heartbeat.on_pong() {
                Some(latency) => {
                    let latency_ms = latency.as_millis() as u64;
                    debug!(station = %self.station, latency_ms, "Pong received");
                    self.shared.latency_ms.store(latency_ms, Ordering::SeqCst);
                    self.handlers.status(ConnectionStatus::connected(latency_ms));
                }
                None => debug!(station = %self.station, "Ignoring pong without outstanding ping"),
            },
            Dispatch::Housekeeping => {}
            Dispatch::Forward(message) => self.handlers.message(message),
        }
    }

    /// Encode and send a frame; `true` once it is on the wire
    async fn send_frame(&mut self, link: &mut dyn Link, frame: &ClientFrame) -> bool {
        match serde_json::to_string(frame) {
            Ok(text) => self.send_text(link, text).await,
            Err(e) => {
                error!(station = %self.station, error = %e, "Failed to encode client frame");
                false
            }
        }
    }

    async fn send_text(&mut self, link: &mut dyn Link, text: String) -> bool {
        if !link.is_open() {
            debug!(station = %self.station, "Link not open, dropping outbound message");
            return false;
        }
        match link.send_text(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(station = %self.station, error = %e, "Send failed");
                self.handlers.error(&e);
                false
            }
        }
    }

    fn report_closed(&mut self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.handlers.close();
        self.handlers
            .status(ConnectionStatus::disconnected(self.heartbeat.latency_ms()));
        self.heartbeat.stop();
    }
}
