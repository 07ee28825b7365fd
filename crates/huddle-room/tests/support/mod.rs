//! In-memory `Connection` and helpers shared by the room tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use huddle_room::Outbound;
use huddle_transport::{Connection, ConnectionId, TransportError};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

pub const WAIT: Duration = Duration::from_secs(2);
pub const QUIET: Duration = Duration::from_millis(100);

/// A connection whose far end is a [`MockPeer`].
pub struct MockConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    shutdown: CancellationToken,
    closed: AtomicBool,
    close_calls: Arc<AtomicUsize>,
    fail_sends: Arc<AtomicBool>,
    send_gate: Option<Arc<Semaphore>>,
}

/// The test's side of a [`MockConnection`].
pub struct MockPeer {
    pub id: ConnectionId,
    inbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    close_calls: Arc<AtomicUsize>,
    fail_sends: Arc<AtomicBool>,
}

pub fn mock_pair() -> (MockConnection, MockPeer) {
    build(None)
}

/// A pair whose sends never complete, like a peer that stopped reading.
pub fn gated_pair() -> (MockConnection, MockPeer) {
    build(Some(Arc::new(Semaphore::new(0))))
}

fn build(send_gate: Option<Arc<Semaphore>>) -> (MockConnection, MockPeer) {
    let id = ConnectionId::next();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let close_calls = Arc::new(AtomicUsize::new(0));
    let fail_sends = Arc::new(AtomicBool::new(false));

    let conn = MockConnection {
        id,
        inbound: Mutex::new(in_rx),
        outbound: out_tx,
        shutdown: CancellationToken::new(),
        closed: AtomicBool::new(false),
        close_calls: Arc::clone(&close_calls),
        fail_sends: Arc::clone(&fail_sends),
        send_gate,
    };
    let peer = MockPeer {
        id,
        inbound: Some(in_tx),
        outbound: out_rx,
        close_calls,
        fail_sends,
    };
    (conn, peer)
}

impl Connection for MockConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        if let Some(gate) = &self.send_gate {
            let permit = tokio::select! {
                _ = self.shutdown.cancelled() => return Err(closed(self.id)),
                permit = gate.acquire() => permit.map_err(|_| closed(self.id))?,
            };
            permit.forget();
        }
        if self.closed.load(Ordering::Acquire) || self.fail_sends.load(Ordering::Acquire) {
            return Err(closed(self.id));
        }
        self.outbound.send(data.to_vec()).map_err(|_| closed(self.id))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            _ = self.shutdown.cancelled() => Ok(None),
            frame = inbound.recv() => Ok(frame),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.shutdown.cancel();
        }
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

fn closed(id: ConnectionId) -> TransportError {
    TransportError::ConnectionClosed(id.to_string())
}

impl MockPeer {
    /// Sends a frame as if the remote client wrote it.
    pub fn send(&self, frame: &str) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(frame.as_bytes().to_vec());
        }
    }

    /// Simulates the remote client going away.
    pub fn disconnect(&mut self) {
        self.inbound = None;
    }

    /// Makes every later send on the connection fail.
    pub fn break_writes(&self) {
        self.fail_sends.store(true, Ordering::Release);
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Waits for the next frame delivered to the client.
    pub async fn recv_json(&mut self) -> serde_json::Value {
        let frame = tokio::time::timeout(WAIT, self.outbound.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("connection dropped");
        serde_json::from_slice(&frame).expect("frame is JSON")
    }

    /// Collects frames until none arrives for [`QUIET`].
    pub async fn drain_json(&mut self) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(Some(frame)) = tokio::time::timeout(QUIET, self.outbound.recv()).await {
            frames.push(serde_json::from_slice(&frame).expect("frame is JSON"));
        }
        frames
    }

    /// Asserts nothing is delivered for [`QUIET`].
    pub async fn assert_silent(&mut self) {
        if let Ok(Some(frame)) = tokio::time::timeout(QUIET, self.outbound.recv()).await {
            panic!("unexpected frame: {}", String::from_utf8_lossy(&frame));
        }
    }
}

/// Decodes every frame currently queued in a raw outbox.
pub fn drain_outbox(rx: &mut mpsc::Receiver<Outbound>) -> Vec<serde_json::Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(serde_json::from_slice(&frame).expect("frame is JSON"));
    }
    frames
}

pub fn join(user: &str) -> serde_json::Value {
    serde_json::json!({ "type": "join", "user": user })
}

pub fn leave(user: &str) -> serde_json::Value {
    serde_json::json!({ "type": "leave", "user": user })
}

pub fn chat(user: &str, content: &str) -> String {
    serde_json::json!({ "type": "chat", "user": user, "content": content }).to_string()
}

pub fn offer(payload: &str) -> String {
    serde_json::json!({ "type": "offer", "payload": payload }).to_string()
}
