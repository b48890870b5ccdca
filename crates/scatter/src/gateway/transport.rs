//! WebSocket transport session.
//!
//! Opens a single WebSocket connection and splits it into a writing half
//! ([`TransportSink`]) and a reading half ([`TransportStream`]). Frames are
//! JSON text; pings, pongs and binary frames are skipped.

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use scatter_proto::InboundFrame;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::ScatterError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on the closing handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on a single frame write, flush included.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a WebSocket connection to `url`.
///
/// # Errors
///
/// Returns [`ScatterError::GatewayConnection`] if the TCP connect, TLS or
/// WebSocket handshake fails, or if `connect_timeout` elapses first.
pub async fn open(
    url: &str,
    connect_timeout: Option<Duration>,
) -> Result<(TransportSink, TransportStream), ScatterError> {
    let connecting = tokio_tungstenite::connect_async(url);
    let result = match connect_timeout {
        Some(limit) => timeout(limit, connecting).await.map_err(|_| {
            ScatterError::GatewayConnection(format!("connect timed out after {limit:?}"))
        })?,
        None => connecting.await,
    };

    let (ws_stream, _response) =
        result.map_err(|e| ScatterError::GatewayConnection(format!("failed to connect: {e}")))?;
    debug!(url, "transport open");

    let (write, read) = ws_stream.split();
    Ok((TransportSink { write }, TransportStream { read }))
}

/// Writing half of a transport session.
pub struct TransportSink {
    write: SplitSink<WsStream, Message>,
}

impl TransportSink {
    /// Write one JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket write fails or the peer stops reading
    /// for longer than the write timeout.
    pub async fn send_text(&mut self, text: String) -> Result<(), ScatterError> {
        timeout(WRITE_TIMEOUT, self.write.send(Message::text(text)))
            .await
            .map_err(|_| {
                ScatterError::GatewayConnection(format!("write timed out after {WRITE_TIMEOUT:?}"))
            })?
            .map_err(|e| ScatterError::GatewayConnection(format!("write failed: {e}")))
    }

    /// Send a close frame and flush, giving up after a bounded wait.
    pub async fn close(mut self) {
        match timeout(CLOSE_TIMEOUT, self.write.close()).await {
            Ok(Ok(())) => debug!("transport closed"),
            Ok(Err(e)) => debug!(error = %e, "transport already gone"),
            Err(_) => warn!("timed out closing transport"),
        }
    }
}

/// Reading half of a transport session.
pub struct TransportStream {
    read: SplitStream<WsStream>,
}

impl TransportStream {
    /// Wait for the next inbound frame.
    ///
    /// Returns `Ok(None)` once the peer closes the connection. Text frames
    /// that are not valid gateway frames are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket read fails.
    pub async fn recv(&mut self) -> Result<Option<InboundFrame>, ScatterError> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => match InboundFrame::from_json(text.as_str()) {
                    Ok(frame) => return Ok(Some(frame)),
                    Err(e) => warn!(error = %e, "failed to parse gateway frame"),
                },
                Some(Ok(Message::Close(close))) => {
                    if let Some(close) = close {
                        debug!(
                            code = u16::from(close.code),
                            reason = close.reason.as_str(),
                            "server closed connection"
                        );
                    }
                    return Ok(None);
                }
                Some(Ok(_)) => {
                    // Ping, Pong, Binary
                }
                Some(Err(e)) => {
                    return Err(ScatterError::GatewayConnection(format!("websocket error: {e}")));
                }
                None => return Ok(None),
            }
        }
    }
}
