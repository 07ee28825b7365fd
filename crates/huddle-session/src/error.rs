//! Error types for the session layer.

use huddle_protocol::RoomId;

/// Errors that can occur while issuing or verifying session tokens.
///
/// Verification failures deliberately collapse into [`InvalidToken`]
/// whatever the cause (bad signature, wrong algorithm, expired, missing
/// claim). The precise reason is logged at debug level, never returned to
/// the caller.
///
/// [`InvalidToken`]: SessionError::InvalidToken
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token failed verification.
    #[error("invalid token")]
    InvalidToken,

    /// The token is valid but was minted for another room.
    #[error("token is bound to room {bound}, not {requested}")]
    RoomMismatch {
        /// The room named in the token.
        bound: RoomId,
        /// The room the caller asked about.
        requested: RoomId,
    },

    /// Signing a new token failed.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}
