//! Session tokens for Huddle.
//!
//! A session token is a short-lived HS256 JWT that binds its bearer to
//! exactly one room. `/create` and `/join` hand one out; the socket upgrade
//! at `/ws` redeems it.
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP surface (above)  ← issues tokens, verifies them before upgrade
//!     ↕
//! Session layer (this crate)  ← signs and verifies room claims
//!     ↕
//! Protocol layer (below)  ← provides RoomId
//! ```
//!
//! There is no revocation list. A leaked token is bounded by its expiry.

mod config;
mod error;
mod token;

pub use config::{DEFAULT_TOKEN_TTL, MAX_TOKEN_SIZE_BYTES, SessionConfig};
pub use error::SessionError;
pub use token::{RoomClaims, TokenService};
