//! # Huddle
//!
//! A real-time room server. Clients create or join a room over HTTP, then
//! connect a WebSocket carrying the room token. Inside a room, chat and
//! presence go to every member; peer-negotiation messages (offer, answer,
//! candidate) are relayed to everyone but the sender.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use huddle::{Config, HuddleServer};
//!
//! # async fn start() -> Result<(), huddle::HuddleError> {
//! let server = HuddleServer::builder()
//!     .config(Config::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
pub mod handlers;
pub mod routes;
mod server;

pub use config::{Config, ConfigError};
pub use error::HuddleError;
pub use server::{HuddleServer, HuddleServerBuilder};

/// Convenient re-exports of the sub-crates' main types.
pub mod prelude {
    pub use crate::{Config, HuddleError, HuddleServer};
    pub use huddle_protocol::{Message, MessageFamily, RoomId};
    pub use huddle_room::{ClientConnection, RoomConfig, RoomHandle, RoomRegistry};
    pub use huddle_session::{SessionConfig, TokenService};
    pub use huddle_transport::{Connection, ConnectionId};
}
