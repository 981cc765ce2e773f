//! Room endpoints

use axum::extract::{Path, State};
use axum::Json;
use muddle_common::model::Room;
use muddle_common::Error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::trimmed;
use crate::error::ApiError;
use crate::registry::room_not_found;
use crate::AppState;

/// Request body for POST /rooms
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub teacher_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub room: Room,
}

/// POST /rooms
///
/// Create a room. Fields are trimmed before validation; a missing or blank
/// id or name is rejected.
pub async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room_id = trimmed(&request.room_id);
    let room_name = trimmed(&request.room_name);
    if room_id.is_empty() || room_name.is_empty() {
        return Err(Error::InvalidInput("Room ID and name are required".to_string()).into());
    }
    let teacher_name = Some(trimmed(&request.teacher_name)).filter(|name| !name.is_empty());

    let room = state.rooms.create(room_id, room_name, teacher_name).await?;
    Ok(Json(RoomResponse { room }))
}

/// GET /rooms
///
/// Liveness ping used by clients at startup; no room listing is exposed.
pub async fn rooms_ping() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// GET /rooms/:room_id
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = state
        .rooms
        .get(&room_id)
        .await?
        .ok_or_else(room_not_found)?;
    Ok(Json(RoomResponse { room }))
}
