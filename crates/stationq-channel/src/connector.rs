//! Connection establishment abstraction
//!
//! The channel actor talks to the push service through [`Connector`] and
//! [`Link`]. [`WsConnector`] is the WebSocket implementation; an in-memory one
//! lives in [`crate::memory`].

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use stationq_core::TransportError;

// ----------------------------------------------------------------------------
// Connector Traits
// ----------------------------------------------------------------------------

/// Event read from an open link
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    /// Text frame
    Text(String),
    /// Link closed by the peer or the stream ended
    Closed(Option<String>),
    /// Read failure; a `Closed` follows
    Error(TransportError),
}

/// Opens links to the push service
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Link>, TransportError>;
}

/// One established push connection
///
/// `next_event` must be cancel safe: the channel polls it inside `select!`.
#[async_trait]
pub trait Link: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn next_event(&mut self) -> WireEvent;

    fn is_open(&self) -> bool;

    async fn close(&mut self);
}

// ----------------------------------------------------------------------------
// WebSocket Connector
// ----------------------------------------------------------------------------

/// Connector over `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Link>, TransportError> {
        let (stream, response) =
            connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: redact(url),
                    reason: e.to_string(),
                })?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsLink { stream, open: true }))
    }
}

struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    open: bool,
}

#[async_trait]
impl Link for WsLink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::SendFailed {
                reason: "connection closed".to_string(),
            });
        }
        self.stream.send(Message::Text(text)).await.map_err(|e| {
            self.open = false;
            TransportError::SendFailed {
                reason: e.to_string(),
            }
        })
    }

    async fn next_event(&mut self) -> WireEvent {
        if !self.open {
            return WireEvent::Closed(None);
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return WireEvent::Text(text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return WireEvent::Text(text),
                    Err(_) => debug!("Dropping non UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    self.open = false;
                    return WireEvent::Closed(frame.map(|f| f.reason.to_string()));
                }
                // Control frames are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.open = false;
                    return WireEvent::Error(TransportError::ReceiveFailed {
                        reason: e.to_string(),
                    });
                }
                None => {
                    self.open = false;
                    return WireEvent::Closed(None);
                }
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            if let Err(e) = self.stream.close(None).await {
                debug!(error = %e, "Error closing WebSocket");
            }
        }
    }
}

/// URL without its query, so tokens stay out of logs and errors
pub(crate) fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    redacted.set_query(None);
    redacted.to_string()
}
