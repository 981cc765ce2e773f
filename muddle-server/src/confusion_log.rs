//! Confusion log
//!
//! Appends anonymous confusion entries scoped to a room and lists them
//! newest-first. Listing is a prefix scan over the room's entries; linear
//! in room size, which is fine at classroom scale.

use crate::registry::RoomRegistry;
use chrono::Utc;
use muddle_common::model::Confusion;
use muddle_common::store::{keys, KvStore};
use muddle_common::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ConfusionLog {
    store: Arc<dyn KvStore>,
    rooms: RoomRegistry,
}

impl ConfusionLog {
    pub fn new(store: Arc<dyn KvStore>, rooms: RoomRegistry) -> Self {
        Self { store, rooms }
    }

    /// Append a confusion to an existing room and return the stored entry,
    /// canonical store key included
    pub async fn submit(
        &self,
        room_id: &str,
        topic: &str,
        details: Option<String>,
    ) -> Result<Confusion> {
        if topic.is_empty() {
            return Err(Error::InvalidInput(
                "Room ID and topic are required".to_string(),
            ));
        }
        self.rooms.require(room_id).await?;

        let timestamp = Utc::now();
        let id = Uuid::new_v4();
        let key = keys::confusion_key(room_id, timestamp, &id);
        let confusion = Confusion {
            id,
            key: key.clone(),
            room_id: room_id.to_string(),
            topic: topic.to_string(),
            details,
            timestamp,
        };
        self.store
            .set(&key, serde_json::to_value(&confusion)?)
            .await?;

        info!("Confusion submitted to room {}: {}", room_id, confusion.topic);
        Ok(confusion)
    }

    /// All confusions for an existing room, newest first. Entry id breaks
    /// timestamp ties so the order stays deterministic.
    pub async fn list_for_room(&self, room_id: &str) -> Result<Vec<Confusion>> {
        self.rooms.require(room_id).await?;

        let mut entries = self.entries_for_room(room_id).await?;
        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });

        debug!("Fetched {} confusions for room {}", entries.len(), room_id);
        Ok(entries)
    }

    /// Remove a single entry by its fully-qualified store key. Idempotent:
    /// deleting an absent key succeeds.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(key).await?;
        info!("Deleted confusion: {}", key);
        Ok(())
    }

    /// Raw per-room entries without the room-existence check or ordering;
    /// shared with the summary service
    pub(crate) async fn entries_for_room(&self, room_id: &str) -> Result<Vec<Confusion>> {
        let values = self
            .store
            .scan_by_prefix(&keys::confusion_prefix(room_id))
            .await?;
        Ok(values.into_iter().filter_map(decode_entry).collect())
    }
}

/// Stored values that no longer decode are skipped with a warning instead
/// of failing the whole listing
fn decode_entry(value: Value) -> Option<Confusion> {
    match serde_json::from_value(value) {
        Ok(confusion) => Some(confusion),
        Err(e) => {
            warn!("Skipping undecodable confusion record: {}", e);
            None
        }
    }
}
