//! Error types for the room layer.

use huddle_protocol::RoomId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room's inbox is closed (its actor has stopped).
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    /// No usable room id could be produced.
    #[error("room id generation failed: {0}")]
    IdGeneration(String),
}
