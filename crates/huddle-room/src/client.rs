//! Admitting a connection into a room: the read and write pumps.
//!
//! Each admitted connection gets two tasks:
//!
//! - the **read pump** forwards every frame the peer sends into the room's
//!   inbox, and unregisters from the room once the peer goes away;
//! - the **write pump** drains the connection's outbox onto the wire, and
//!   exits once the room drops the outbox or cancels the connection's
//!   eviction token.
//!
//! Whichever pump finishes first closes the transport, which in turn ends
//! the other one. An evicted connection is closed even while a write to its
//! stalled socket is still pending.

use std::sync::Arc;

use huddle_transport::{Connection, ConnectionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{Outbound, RoomError, RoomHandle};

/// Display name used when a client does not supply one.
pub const DEFAULT_DISPLAY_NAME: &str = "???";

/// A transport connection on its way into a room.
pub struct ClientConnection<C: Connection> {
    conn: Arc<C>,
    display_name: String,
    room: RoomHandle,
}

impl<C: Connection> ClientConnection<C> {
    /// Pairs `conn` with `room`. An empty `display_name` becomes
    /// [`DEFAULT_DISPLAY_NAME`].
    pub fn new(conn: C, display_name: impl Into<String>, room: RoomHandle) -> Self {
        let mut display_name = display_name.into();
        if display_name.is_empty() {
            display_name = DEFAULT_DISPLAY_NAME.to_owned();
        }
        Self {
            conn: Arc::new(conn),
            display_name,
            room,
        }
    }

    /// Returns the connection's id.
    pub fn id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// Returns the name announced in `join` and `leave`.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the room this connection is admitted into.
    pub fn room(&self) -> &RoomHandle {
        &self.room
    }

    /// Registers with the room, then spawns both pumps.
    ///
    /// `outbox_capacity` bounds how far this connection may fall behind
    /// before the room evicts it.
    ///
    /// # Errors
    /// Returns [`RoomError::Unavailable`] if the room has stopped; the
    /// transport is closed in that case.
    pub async fn start(self, outbox_capacity: usize) -> Result<ClientTasks, RoomError> {
        let id = self.conn.id();
        let (outbox_tx, outbox_rx) = mpsc::channel(outbox_capacity.max(1));
        let evicted = CancellationToken::new();

        if let Err(e) = self
            .room
            .register(id, self.display_name.clone(), outbox_tx, evicted.clone())
            .await
        {
            tracing::warn!(conn_id = %id, error = %e, "failed to register with room");
            if let Err(e) = self.conn.close().await {
                tracing::debug!(conn_id = %id, error = %e, "close failed");
            }
            return Err(e);
        }

        tracing::info!(
            room_id = %self.room.room_id(),
            conn_id = %id,
            user = %self.display_name,
            "client admitted"
        );

        let write = tokio::spawn(write_pump(Arc::clone(&self.conn), outbox_rx, evicted));
        let read = tokio::spawn(read_pump(self.conn, self.room));
        Ok(ClientTasks { read, write })
    }
}

/// The two tasks serving an admitted connection.
#[derive(Debug)]
pub struct ClientTasks {
    read: JoinHandle<()>,
    write: JoinHandle<()>,
}

impl ClientTasks {
    /// Waits until both pumps have finished.
    pub async fn join(self) {
        if let Err(e) = self.read.await {
            tracing::error!(error = %e, "read pump panicked");
        }
        if let Err(e) = self.write.await {
            tracing::error!(error = %e, "write pump panicked");
        }
    }

    /// Whether both pumps have finished.
    pub fn is_finished(&self) -> bool {
        self.read.is_finished() && self.write.is_finished()
    }
}

async fn read_pump<C: Connection>(conn: Arc<C>, room: RoomHandle) {
    let id = conn.id();

    loop {
        match conn.recv().await {
            Ok(Some(payload)) => {
                if let Err(e) = room.inbound(id, payload) {
                    tracing::warn!(conn_id = %id, error = %e, "room gone, disconnecting");
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!(conn_id = %id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(conn_id = %id, error = %e, "read failed");
                break;
            }
        }
    }

    if let Err(e) = room.unregister(id) {
        tracing::debug!(conn_id = %id, error = %e, "unregister failed");
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(conn_id = %id, error = %e, "close failed");
    }
}

async fn write_pump<C: Connection>(
    conn: Arc<C>,
    mut outbox: mpsc::Receiver<Outbound>,
    evicted: CancellationToken,
) {
    let id = conn.id();

    loop {
        let payload = tokio::select! {
            _ = evicted.cancelled() => break,
            payload = outbox.recv() => match payload {
                Some(payload) => payload,
                None => break,
            },
        };
        tokio::select! {
            _ = evicted.cancelled() => break,
            result = conn.send(&payload) => {
                if let Err(e) = result {
                    tracing::debug!(conn_id = %id, error = %e, "write failed");
                    break;
                }
            }
        }
    }

    if evicted.is_cancelled() {
        tracing::info!(conn_id = %id, "evicted, disconnecting");
    }

    // Wakes the read pump, which then unregisters.
    if let Err(e) = conn.close().await {
        tracing::debug!(conn_id = %id, error = %e, "close failed");
    }
}
