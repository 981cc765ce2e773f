//! Data models for rooms, confusions and summaries
//!
//! All wire and stored JSON uses camelCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Teacher name applied when room creation omits one
pub const DEFAULT_TEACHER_NAME: &str = "Anonymous Teacher";

/// A named class session students join to submit confusions.
/// Created once, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// User-chosen unique identifier; doubles as the join code
    pub id: String,
    pub name: String,
    pub teacher_name: String,
    pub created_at: DateTime<Utc>,
}

/// A single anonymous confusion entry tied to a room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confusion {
    /// Generated unique token
    pub id: Uuid,
    /// Canonical store key, carried on the record so deletion never has to
    /// recompute it
    pub key: String,
    pub room_id: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// AI-generated digest of a room's confusions at a point in time.
/// Derived data; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub text: String,
    pub confusion_count: usize,
    pub generated_at: DateTime<Utc>,
}
