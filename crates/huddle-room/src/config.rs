//! Room configuration.

/// Default capacity of a connection's outbox.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Queue sizes for the connections admitted into rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomConfig {
    /// Pending payloads a connection buffers before the room evicts it as
    /// a slow consumer.
    pub outbox_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}
