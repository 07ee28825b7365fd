//! Error types for the protocol layer.
//!
//! Each crate in Huddle defines its own error enum. A `ProtocolError`
//! always means a payload could not be turned into (or out of) a
//! [`Message`](crate::Message); it never says anything about the socket
//! or the room it arrived on.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or a
    /// `type` discriminator that names no known message.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
