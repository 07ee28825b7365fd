//! Room actor: an isolated Tokio task that owns one room's member set.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an unbounded mpsc inbox. Registration, departure, and fan-out
//! are all serialized through that inbox, so the member map needs no lock.
//! Producers never wait on the inbox, so one member flooding the room cannot
//! hold up another member's registration or departure.
//!
//! The actor never awaits anything but its own inbox. Delivery to members
//! uses `try_send` on their bounded outboxes; a member whose outbox is full
//! is evicted as a slow consumer instead of stalling the room, and its
//! eviction token is cancelled so its pumps tear the connection down.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use huddle_protocol::{Codec, JsonCodec, Message, MessageFamily, RoomId};
use huddle_transport::ConnectionId;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::RoomError;

/// One encoded frame on its way to a member. Shared by every recipient of a
/// broadcast.
pub type Outbound = Arc<[u8]>;

/// Sending half of a member's outbox. Owned by the room while the member is
/// registered; dropping it is what ends the member's write pump.
pub type Outbox = mpsc::Sender<Outbound>;

/// Commands sent to a room actor through its inbox.
pub(crate) enum RoomCommand {
    /// Add a member.
    Register {
        id: ConnectionId,
        display_name: String,
        outbox: Outbox,
        evicted: CancellationToken,
        reply: oneshot::Sender<()>,
    },

    /// Remove a member. Unknown ids are ignored.
    Unregister { id: ConnectionId },

    /// A raw frame read from a member's connection.
    Inbound { from: ConnectionId, payload: Vec<u8> },

    /// Request a snapshot of the member set.
    Info { reply: oneshot::Sender<RoomInfo> },
}

/// A registered member, as seen from outside the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub id: ConnectionId,
    pub display_name: String,
}

/// A snapshot of a room's membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    /// The room's id.
    pub room_id: RoomId,
    /// Current members, ordered by connection id.
    pub members: Vec<MemberInfo>,
}

impl RoomInfo {
    /// Number of members at the time of the snapshot.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Whether `id` was a member at the time of the snapshot.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }
}

/// Handle to a running room actor.
///
/// Cheap to clone; it's an `mpsc::UnboundedSender` plus the room id. The
/// registry and every admitted connection hold one.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's id.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Registers a member and waits until the room has taken it in.
    ///
    /// Every member (the new one included) is sent a `join` for
    /// `display_name`. Registering an id that is already a member replaces
    /// its outbox and sends no second `join`.
    ///
    /// The room cancels `evicted` if it ever drops the member as a slow
    /// consumer; a plain unregister leaves it untouched.
    pub async fn register(
        &self,
        id: ConnectionId,
        display_name: impl Into<String>,
        outbox: Outbox,
        evicted: CancellationToken,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Register {
            id,
            display_name: display_name.into(),
            outbox,
            evicted,
            reply: reply_tx,
        })?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Removes a member (fire-and-forget).
    pub fn unregister(&self, id: ConnectionId) -> Result<(), RoomError> {
        self.send(RoomCommand::Unregister { id })
    }

    /// Hands a raw frame from member `from` to the room (fire-and-forget).
    ///
    /// Never waits: the inbox is unbounded.
    pub fn inbound(&self, from: ConnectionId, payload: Vec<u8>) -> Result<(), RoomError> {
        self.send(RoomCommand::Inbound { from, payload })
    }

    /// Requests a membership snapshot.
    ///
    /// The reply is produced after every command queued before it, so a
    /// caller can use it to wait until earlier traffic has been fanned out.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Info { reply: reply_tx })?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }
}

struct Member {
    display_name: String,
    outbox: Outbox,
    evicted: CancellationToken,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    members: HashMap<ConnectionId, Member>,
    codec: JsonCodec,
    receiver: mpsc::UnboundedReceiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until every handle has been dropped.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Register {
                    id,
                    display_name,
                    outbox,
                    evicted,
                    reply,
                } => {
                    self.handle_register(id, display_name, outbox, evicted);
                    let _ = reply.send(());
                }
                RoomCommand::Unregister { id } => self.handle_unregister(id),
                RoomCommand::Inbound { from, payload } => {
                    self.handle_inbound(from, payload);
                }
                RoomCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle_register(
        &mut self,
        id: ConnectionId,
        display_name: String,
        outbox: Outbox,
        evicted: CancellationToken,
    ) {
        let member = Member {
            display_name: display_name.clone(),
            outbox,
            evicted,
        };
        if self.members.insert(id, member).is_some() {
            tracing::debug!(
                room_id = %self.room_id,
                conn_id = %id,
                "member re-registered, outbox replaced"
            );
            return;
        }

        tracing::info!(
            room_id = %self.room_id,
            conn_id = %id,
            user = %display_name,
            members = self.members.len(),
            "member joined"
        );
        self.broadcast_message(&Message::join(display_name));
    }

    fn handle_unregister(&mut self, id: ConnectionId) {
        // The outbox sender is dropped with the member, which lets the
        // write pump drain and exit.
        let Some(member) = self.members.remove(&id) else {
            tracing::debug!(
                room_id = %self.room_id,
                conn_id = %id,
                "unregister for non-member, ignoring"
            );
            return;
        };

        tracing::info!(
            room_id = %self.room_id,
            conn_id = %id,
            user = %member.display_name,
            members = self.members.len(),
            "member left"
        );
        self.broadcast_message(&Message::leave(member.display_name));
    }

    fn handle_inbound(&mut self, from: ConnectionId, payload: Vec<u8>) {
        if !self.members.contains_key(&from) {
            tracing::debug!(
                room_id = %self.room_id,
                conn_id = %from,
                "frame from non-member, ignoring"
            );
            return;
        }

        let message = match Message::classify(&payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    room_id = %self.room_id,
                    conn_id = %from,
                    error = %e,
                    "dropping unclassifiable frame"
                );
                return;
            }
        };

        let except = match message.family() {
            MessageFamily::Room => None,
            MessageFamily::Relay => Some(from),
        };
        tracing::trace!(
            room_id = %self.room_id,
            conn_id = %from,
            kind = message.kind(),
            family = %message.family(),
            "routing frame"
        );

        // Forwarded verbatim: members see exactly the bytes the sender wrote.
        self.broadcast(Outbound::from(payload), except);
    }

    /// Encodes a room-originated message and sends it to every member.
    fn broadcast_message(&mut self, message: &Message) {
        match self.codec.encode(message) {
            Ok(bytes) => self.broadcast(Outbound::from(bytes), None),
            Err(e) => tracing::error!(
                room_id = %self.room_id,
                error = %e,
                "failed to encode room message"
            ),
        }
    }

    /// Offers `payload` to every member except `except`.
    ///
    /// Members whose outbox is full are evicted once the pass is done, and
    /// each eviction queues exactly one `leave` for whoever remains.
    /// Evictions are processed iteratively, so a cascade of slow consumers
    /// never recurses.
    fn broadcast(&mut self, payload: Outbound, except: Option<ConnectionId>) {
        let mut pending = VecDeque::from([(payload, except)]);

        while let Some((payload, except)) = pending.pop_front() {
            let mut evicted = Vec::new();

            for (id, member) in &self.members {
                if Some(*id) == except {
                    continue;
                }
                match member.outbox.try_send(Arc::clone(&payload)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => evicted.push(*id),
                    // The read pump is already on its way to unregistering.
                    Err(TrySendError::Closed(_)) => {}
                }
            }

            for id in evicted {
                let Some(member) = self.members.remove(&id) else {
                    continue;
                };
                tracing::warn!(
                    room_id = %self.room_id,
                    conn_id = %id,
                    user = %member.display_name,
                    "outbox full, evicting slow consumer"
                );
                member.evicted.cancel();
                match self.codec.encode(&Message::leave(member.display_name)) {
                    Ok(bytes) => pending.push_back((Outbound::from(bytes), None)),
                    Err(e) => tracing::error!(
                        room_id = %self.room_id,
                        error = %e,
                        "failed to encode leave"
                    ),
                }
            }
        }
    }

    fn info(&self) -> RoomInfo {
        let mut members: Vec<MemberInfo> = self
            .members
            .iter()
            .map(|(id, m)| MemberInfo {
                id: *id,
                display_name: m.display_name.clone(),
            })
            .collect();
        members.sort_by_key(|m| m.id);

        RoomInfo {
            room_id: self.room_id.clone(),
            members,
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// The actor stops once every handle has been dropped.
pub(crate) fn spawn_room(room_id: RoomId) -> RoomHandle {
    let (tx, rx) = mpsc::unbounded_channel();

    let actor = RoomActor {
        room_id: room_id.clone(),
        members: HashMap::new(),
        codec: JsonCodec,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
