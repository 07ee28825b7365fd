//! WebSocket connection over a socket upgraded by `axum`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{Connection, ConnectionId, TransportError};

/// How long `close` waits for the close frame to be flushed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A single WebSocket connection.
///
/// The socket is split so the read and write halves sit behind separate
/// locks: a pending `recv` never blocks a `send`. Closing cancels any
/// pending `recv` or `send`, so `close` never waits behind a stalled peer.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl WebSocketConnection {
    /// Wraps an upgraded socket and assigns it a fresh [`ConnectionId`].
    pub fn new(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        let id = ConnectionId::next();
        tracing::debug!(%id, "accepted WebSocket connection");
        Self {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(self.closed_error());
        }
        // Outbound frames are always text.
        let text = String::from_utf8(data.to_vec()).map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e,
            ))
        })?;

        let mut sink = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(self.closed_error()),
            sink = self.sink.lock() => sink,
        };
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(self.closed_error()),
            result = sink.send(Message::Text(text)) => result.map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            }),
        }
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            let msg = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(None),
                msg = stream.next() => msg,
            };
            match msg {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.into_bytes()));
                }
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Releases the sink lock if a send is parked on a stalled peer.
        self.shutdown.cancel();
        tracing::debug!(id = %self.id, "closing WebSocket connection");

        let handshake = async { self.sink.lock().await.close().await };
        match tokio::time::timeout(CLOSE_TIMEOUT, handshake).await {
            Ok(result) => result.map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            }),
            Err(_) => {
                tracing::debug!(id = %self.id, "close frame not flushed, dropping");
                Ok(())
            }
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl WebSocketConnection {
    fn closed_error(&self) -> TransportError {
        TransportError::ConnectionClosed(self.id.to_string())
    }
}
