//! Rooms for Huddle.
//!
//! A room is a Tokio task that owns its member set and fans frames out to
//! members' outboxes. This crate provides:
//!
//! - [`RoomRegistry`]: creates rooms under fresh ids and resolves them
//! - [`RoomHandle`]: the cloneable address of one room actor
//! - [`ClientConnection`]: admits a transport connection into a room and
//!   drives its read and write pumps
//!
//! ```text
//! Connection ──read pump──► room inbox ──fan-out──► outboxes ──write pumps──► Connections
//! ```

mod client;
mod config;
mod error;
mod id;
mod registry;
mod room;

pub use client::{ClientConnection, ClientTasks, DEFAULT_DISPLAY_NAME};
pub use config::{DEFAULT_OUTBOX_CAPACITY, RoomConfig};
pub use error::RoomError;
pub use id::{IdSource, MIN_ID_LENGTH, TimeIdSource};
pub use registry::RoomRegistry;
pub use room::{MemberInfo, Outbound, Outbox, RoomHandle, RoomInfo};
