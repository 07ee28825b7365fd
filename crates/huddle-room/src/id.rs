//! Room id generation.

use std::time::{SystemTime, UNIX_EPOCH};

use huddle_protocol::RoomId;

use crate::RoomError;

/// Shortest id [`TimeIdSource`] produces.
pub const MIN_ID_LENGTH: usize = 6;

const ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Produces candidate room ids.
///
/// Candidates need not be unique; the registry retries on collision.
/// Closures of the right shape implement this too, which keeps tests
/// deterministic.
pub trait IdSource: Send + 'static {
    /// Returns the next candidate id.
    ///
    /// # Errors
    /// Returns [`RoomError::IdGeneration`] when no candidate can be made.
    fn next_id(&mut self) -> Result<RoomId, RoomError>;
}

impl<F> IdSource for F
where
    F: FnMut() -> Result<RoomId, RoomError> + Send + 'static,
{
    fn next_id(&mut self) -> Result<RoomId, RoomError> {
        self()
    }
}

/// Default id source: the current Unix second mixed with a random salt,
/// rendered in base62.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeIdSource;

impl IdSource for TimeIdSource {
    fn next_id(&mut self) -> Result<RoomId, RoomError> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| RoomError::IdGeneration(e.to_string()))?
            .as_secs();
        let salt: u16 = rand::random();
        let value = (secs << 16) | u64::from(salt);
        Ok(RoomId::new(encode_base62(value, MIN_ID_LENGTH)))
    }
}

/// Encodes `value` in base62, left-padded with `0` to `min_len` digits.
fn encode_base62(mut value: u64, min_len: usize) -> String {
    let mut digits = Vec::with_capacity(min_len.max(11));
    while value > 0 {
        digits.push(ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    while digits.len() < min_len {
        digits.push(b'0');
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}
