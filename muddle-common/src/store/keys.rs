//! Store key conventions
//!
//! Record kinds are distinguished by key prefix within the shared
//! namespace:
//! - `room:<id>`
//! - `confusion:<roomId>:<millis>:<id>`
//! - `summary:<roomId>:<millis>`
//!
//! Timestamps are embedded as Unix milliseconds so keys stay compact.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn room_key(room_id: &str) -> String {
    format!("room:{}", room_id)
}

pub fn confusion_key(room_id: &str, timestamp: DateTime<Utc>, id: &Uuid) -> String {
    format!(
        "confusion:{}:{}:{}",
        room_id,
        timestamp.timestamp_millis(),
        id
    )
}

/// Prefix covering every confusion in a room
pub fn confusion_prefix(room_id: &str) -> String {
    format!("confusion:{}:", room_id)
}

pub fn summary_key(room_id: &str, generated_at: DateTime<Utc>) -> String {
    format!("summary:{}:{}", room_id, generated_at.timestamp_millis())
}

/// Prefix covering every stored summary for a room
pub fn summary_prefix(room_id: &str) -> String {
    format!("summary:{}:", room_id)
}
