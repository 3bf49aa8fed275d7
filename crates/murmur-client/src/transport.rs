//! WebSocket transport.
//!
//! [`WsDriver`] carries the JSON text-frame protocol over
//! `tokio-tungstenite`. It is a thin layer: frames are encoded and decoded
//! here, protocol logic stays in the Sans-IO client. `wss://` URLs use rustls
//! with the webpki root store.

use futures::{SinkExt, StreamExt};
use murmur_proto::{ClientMessage, ProtocolError, ServerMessage};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::driver::{Driver, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Write failed.
    #[error("send failed: {0}")]
    Send(String),

    /// No transport is open.
    #[error("not connected")]
    NotConnected,

    /// Frame could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// WebSocket driver.
#[derive(Default)]
pub struct WsDriver {
    stream: Option<WsStream>,
}

impl WsDriver {
    /// Create a driver with no open transport.
    ///
    /// Installs ring as the process-wide rustls provider unless one is
    /// already set.
    pub fn new() -> Self {
        if rustls::crypto::ring::default_provider().install_default().is_err() {
            tracing::debug!("rustls crypto provider already installed");
        }
        Self::default()
    }

    fn closed(&mut self, reason: String) -> Option<TransportEvent> {
        self.stream = None;
        Some(TransportEvent::Closed { reason })
    }
}

impl std::fmt::Debug for WsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsDriver").field("connected", &self.stream.is_some()).finish()
    }
}

impl Driver for WsDriver {
    type Error = TransportError;

    async fn connect(&mut self, url: &str) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }

        let (stream, response) =
            connect_async(url).await.map_err(|e| TransportError::Connection(e.to_string()))?;
        tracing::debug!(%url, status = %response.status(), "websocket open");

        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, message: ClientMessage) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let text = message.encode()?;
        stream.send(Message::text(text)).await.map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        loop {
            let stream = self.stream.as_mut()?;
            let Some(item) = stream.next().await else {
                return self.closed("connection closed".to_string());
            };

            match item {
                Ok(Message::Text(text)) => match ServerMessage::decode(text.as_str()) {
                    Ok(message) => return Some(TransportEvent::Message(message)),
                    Err(e) => tracing::warn!(error = %e, "dropping malformed frame"),
                },
                Ok(Message::Close(frame)) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_string())
                        .filter(|reason| !reason.is_empty())
                        .unwrap_or_else(|| "server closed the connection".to_string());
                    return self.closed(reason);
                },
                Ok(Message::Binary(_)) => tracing::warn!("dropping binary frame"),
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {},
                Err(e) => return self.closed(e.to_string()),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take()
            && let Err(e) = stream.close(None).await
        {
            tracing::debug!(error = %e, "error closing websocket");
        }
    }
}
