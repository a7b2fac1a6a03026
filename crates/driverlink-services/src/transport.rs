//! Session transport: one authenticated socket to the backend.
//!
//! The access token travels as a `token` query parameter, so a new token
//! always needs a brand-new connection.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use driverlink_core::OutboundFrame;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid socket url: {0}")]
    Url(#[from] url::ParseError),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("frame encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport is closed")]
    Closed,
}

/// Opens transports. One call = one handshake.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, token: &str) -> Result<Box<dyn Transport>, TransportError>;
}

/// A live connection. Dropping it releases the underlying socket.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, frame: &OutboundFrame) -> Result<(), TransportError>;

    /// Next inbound text frame; `None` once the peer has closed.
    ///
    /// Must be cancel-safe: the session polls it inside `select!`.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close politely. Idempotent.
    async fn close(&mut self);
}

// ── WebSocket ────────────────────────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketConnector {
    base: Url,
    connect_timeout: Option<Duration>,
}

impl WebSocketConnector {
    pub fn new(socket_url: &str, connect_timeout: Option<Duration>) -> Result<Self, TransportError> {
        Ok(Self {
            base: Url::parse(socket_url)?,
            connect_timeout,
        })
    }

    /// Socket URL with `token` set, replacing any token already present.
    pub fn url_for(&self, token: &str) -> Url {
        let mut url = self.base.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "token")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        {
            let mut q = url.query_pairs_mut();
            q.clear();
            for (k, v) in &kept {
                q.append_pair(k, v);
            }
            q.append_pair("token", token);
        }
        url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, token: &str) -> Result<Box<dyn Transport>, TransportError> {
        let url = self.url_for(token);
        let handshake = tokio_tungstenite::connect_async(url.as_str());
        let (ws, _resp) = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, handshake)
                .await
                .map_err(|_| TransportError::Timeout(limit))??,
            None => handshake.await?,
        };
        tracing::debug!(host = url.host_str().unwrap_or(""), "websocket handshake complete");
        Ok(Box::new(WebSocketTransport { ws, closed: false }))
    }
}

pub struct WebSocketTransport {
    ws: WsStream,
    closed: bool,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: &OutboundFrame) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let text = frame.encode()?;
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        if self.closed {
            return None;
        }
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "server closed the socket");
                    self.closed = true;
                    return None;
                }
                // Ping/pong are answered by tungstenite; binary is not part
                // of this protocol.
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.closed = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.ws.close(None).await {
            tracing::debug!(error = %e, "websocket close handshake failed");
        }
    }
}
