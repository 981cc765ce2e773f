//! Room registry
//!
//! Creates and looks up room records. Room ids are user-chosen and unique
//! across the store; creation never overwrites an existing room.

use chrono::Utc;
use muddle_common::model::{Room, DEFAULT_TEACHER_NAME};
use muddle_common::store::{keys, KvStore};
use muddle_common::{Error, Result};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct RoomRegistry {
    store: Arc<dyn KvStore>,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Create a room, rejecting ids that are already taken
    pub async fn create(&self, id: &str, name: &str, teacher_name: Option<&str>) -> Result<Room> {
        if id.is_empty() || name.is_empty() {
            return Err(Error::InvalidInput(
                "Room ID and name are required".to_string(),
            ));
        }
        // Room ids become key segments; a ':' would let one room's prefix
        // scan pick up another room's entries
        if id.contains(':') {
            return Err(Error::InvalidInput(
                "Room ID must not contain ':'".to_string(),
            ));
        }

        let key = keys::room_key(id);
        if self.store.get(&key).await?.is_some() {
            return Err(Error::Duplicate("Room ID already exists".to_string()));
        }

        let room = Room {
            id: id.to_string(),
            name: name.to_string(),
            teacher_name: teacher_name.unwrap_or(DEFAULT_TEACHER_NAME).to_string(),
            created_at: Utc::now(),
        };
        self.store.set(&key, serde_json::to_value(&room)?).await?;

        info!("Room created: {} ({})", room.id, room.name);
        Ok(room)
    }

    /// Look up a room by id; unknown ids are simply absent, never an error
    pub async fn get(&self, id: &str) -> Result<Option<Room>> {
        match self.store.get(&keys::room_key(id)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Variant of [`get`](Self::get) for places where the room must exist
    pub async fn require(&self, id: &str) -> Result<Room> {
        self.get(id).await?.ok_or_else(room_not_found)
    }
}

pub(crate) fn room_not_found() -> Error {
    Error::NotFound("Room not found".to_string())
}
