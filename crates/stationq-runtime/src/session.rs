//! Station session
//!
//! Binds one push channel to the reconciler for the selected station. Frames
//! forwarded by the channel are applied in receipt order by a pump task, and
//! the latest [`ConnectionStatus`] is published on a watch channel.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use stationq_channel::{
    ChannelCredentials, ChannelHandle, ChannelHandlers, Connector, QueueChannel, WsConnector,
};
use stationq_core::{
    ChannelConfig, ConnectionStatus, PushMessage, QueueApi, Result, StationId, Timestamp,
};

use crate::reconciler::Reconciler;

enum SessionEvent {
    Opened,
    Status(ConnectionStatus),
    Message(PushMessage),
}

struct ActiveChannel {
    handle: ChannelHandle,
    pump: JoinHandle<()>,
}

pub struct StationSession {
    reconciler: Arc<Reconciler>,
    connector: Arc<dyn Connector>,
    config: ChannelConfig,
    credentials: ChannelCredentials,
    status: Arc<watch::Sender<ConnectionStatus>>,
    active: Option<ActiveChannel>,
}

impl StationSession {
    pub fn new(
        api: Arc<dyn QueueApi>,
        config: ChannelConfig,
        credentials: ChannelCredentials,
    ) -> Self {
        Self::with_connector(api, Arc::new(WsConnector), config, credentials)
    }

    pub fn with_connector(
        api: Arc<dyn QueueApi>,
        connector: Arc<dyn Connector>,
        config: ChannelConfig,
        credentials: ChannelCredentials,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            reconciler: Arc::new(Reconciler::new(api)),
            connector,
            config,
            credentials,
            status: Arc::new(status),
            active: None,
        }
    }

    /// Select `station`, load its queue and summaries, and open its channel
    pub async fn start(&mut self, station: StationId) -> Result<()> {
        self.switch_station(station).await
    }

    /// Tear down the current channel, then select and connect `station`
    pub async fn switch_station(&mut self, station: StationId) -> Result<()> {
        self.teardown().await;

        if let Err(e) = self.reconciler.select_station(station.clone()).await {
            warn!(%station, error = %e, "Initial queue fetch failed, waiting for updates");
        }
        if let Err(e) = self.reconciler.refresh_summaries().await {
            warn!(error = %e, "Initial summary fetch failed");
        }

        let (events, receiver) = mpsc::unbounded_channel();
        let handle = QueueChannel::open_with(
            self.connector.clone(),
            station.clone(),
            self.config.clone(),
            self.credentials.clone(),
            forwarding_handlers(events),
        )?;
        let pump = tokio::spawn(pump(receiver, self.reconciler.clone(), self.status.clone()));

        info!(%station, "Station session started");
        self.active = Some(ActiveChannel { handle, pump });
        Ok(())
    }

    /// Disconnect and discard the selected station
    pub async fn shutdown(&mut self) {
        self.teardown().await;
        self.reconciler.clear_selection().await;
        info!("Station session shut down");
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn channel(&self) -> Option<&ChannelHandle> {
        self.active.as_ref().map(|active| &active.handle)
    }

    pub fn station(&self) -> Option<&StationId> {
        self.channel().map(ChannelHandle::station)
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    async fn teardown(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let station = active.handle.station().clone();
        active.handle.disconnect();
        active.handle.join().await;
        // Handlers went away with the channel task, so the pump drains and ends
        if let Err(e) = active.pump.await {
            warn!(%station, error = %e, "Session pump failed");
        }
        self.status.send_replace(ConnectionStatus::default());
        debug!(%station, "Station channel torn down");
    }
}

fn forwarding_handlers(events: mpsc::UnboundedSender<SessionEvent>) -> ChannelHandlers {
    let opened = events.clone();
    let status = events.clone();
    ChannelHandlers::new()
        .on_open(move || {
            let _ = opened.send(SessionEvent::Opened);
        })
        .on_connection_status(move |s| {
            let _ = status.send(SessionEvent::Status(s));
        })
        .on_error(|e| debug!(error = %e, "Push channel error"))
        .on_message(move |m| {
            let _ = events.send(SessionEvent::Message(m));
        })
}

async fn pump(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    reconciler: Arc<Reconciler>,
    status: Arc<watch::Sender<ConnectionStatus>>,
) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Opened => {
                status.send_modify(|current| current.last_update = Some(Timestamp::now()));
            }
            SessionEvent::Status(update) => {
                status.send_modify(|current| {
                    *current = ConnectionStatus {
                        last_update: current.last_update,
                        ..update
                    };
                });
            }
            SessionEvent::Message(message) => {
                status.send_modify(|current| current.last_update = Some(Timestamp::now()));
                match message.frame {
                    Some(frame) => {
                        let outcome = reconciler.apply_push(&frame).await;
                        debug!(kind = frame.type_name(), ?outcome, "Push applied");
                    }
                    None => debug!(raw = %message.raw, "Undecoded push frame"),
                }
            }
        }
    }
}
