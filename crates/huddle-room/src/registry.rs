//! Room registry: creates rooms and resolves room ids to live handles.

use std::collections::HashMap;
use std::fmt;

use huddle_protocol::RoomId;
use tokio::sync::Mutex;

use crate::room::spawn_room;
use crate::{IdSource, RoomConfig, RoomError, RoomHandle, RoomInfo, TimeIdSource};

/// Fresh candidates drawn per `create_room` before giving up on collisions.
const MAX_ID_ATTEMPTS: usize = 16;

/// Every room created in this process, keyed by id.
///
/// Safe to share behind an `Arc`: the map and the id source sit behind one
/// lock, so two concurrent creations can never claim the same id. Rooms are
/// never removed.
pub struct RoomRegistry {
    inner: Mutex<Inner>,
    config: RoomConfig,
}

struct Inner {
    rooms: HashMap<RoomId, RoomHandle>,
    ids: Box<dyn IdSource>,
}

impl RoomRegistry {
    /// Creates an empty registry with time-derived room ids.
    pub fn new(config: RoomConfig) -> Self {
        Self::with_id_source(config, TimeIdSource)
    }

    /// Creates an empty registry drawing ids from `ids`.
    pub fn with_id_source(config: RoomConfig, ids: impl IdSource) -> Self {
        Self {
            inner: Mutex::new(Inner {
                rooms: HashMap::new(),
                ids: Box::new(ids),
            }),
            config,
        }
    }

    /// Returns the queue sizes rooms and their connections use.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a room under a fresh id and starts its actor.
    ///
    /// # Errors
    /// Returns [`RoomError::IdGeneration`] if the id source fails, or if
    /// every candidate drawn collides with an existing room.
    pub async fn create_room(&self) -> Result<RoomHandle, RoomError> {
        let mut inner = self.inner.lock().await;
        let room_id = inner.unused_id()?;

        let handle = spawn_room(room_id.clone());
        inner.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, rooms = inner.rooms.len(), "room created");
        Ok(handle)
    }

    /// Returns the handle for `room_id`, if that room exists.
    pub async fn lookup(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.inner.lock().await.rooms.get(room_id).cloned()
    }

    /// Like [`lookup`](Self::lookup), but unknown ids are an error.
    pub async fn get(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.lookup(room_id)
            .await
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Whether `room_id` names an existing room.
    pub async fn contains(&self, room_id: &RoomId) -> bool {
        self.inner.lock().await.rooms.contains_key(room_id)
    }

    /// Returns a membership snapshot of one room.
    pub async fn room_info(&self, room_id: &RoomId) -> Result<RoomInfo, RoomError> {
        self.get(room_id).await?.info().await
    }

    /// Returns the number of rooms.
    pub async fn room_count(&self) -> usize {
        self.inner.lock().await.rooms.len()
    }

    /// Lists every room id.
    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.inner.lock().await.rooms.keys().cloned().collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

impl fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn unused_id(&mut self) -> Result<RoomId, RoomError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = self.ids.next_id()?;
            if !self.rooms.contains_key(&candidate) {
                return Ok(candidate);
            }
            tracing::debug!(room_id = %candidate, "room id collision, retrying");
        }
        Err(RoomError::IdGeneration(format!(
            "no unused id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }
}
