//! HTTP API handlers

pub mod confusions;
pub mod health;
pub mod rooms;
pub mod summaries;

pub use confusions::{delete_confusion, list_confusions, submit_confusion};
pub use health::health_routes;
pub use rooms::{create_room, get_room, rooms_ping};
pub use summaries::{list_summaries, summarize_room};

/// Trimmed view of an optional request field, absent collapsing to empty
pub(crate) fn trimmed(field: &Option<String>) -> &str {
    field.as_deref().map(str::trim).unwrap_or("")
}
