//! Wire protocol for Huddle.
//!
//! This crate defines the "language" that clients and the room server
//! speak:
//!
//! - **Types** ([`Message`], [`MessageFamily`], [`RoomId`]) — the message
//!   structures that travel on the wire and the routing family of each.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the room hub.
//! It doesn't know about connections or rooms, only how to classify a
//! frame:
//!
//! ```text
//! Transport (bytes) → Protocol (Message + family) → Room (fan-out)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Message, MessageFamily, RoomId};
