//! Confusion endpoints

use axum::extract::{Path, State};
use axum::Json;
use muddle_common::model::Confusion;
use muddle_common::Error;
use serde::{Deserialize, Serialize};

use super::trimmed;
use crate::error::ApiError;
use crate::AppState;

/// Request body for POST /confusions
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitConfusionRequest {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfusionResponse {
    pub confusion: Confusion,
}

#[derive(Debug, Serialize)]
pub struct ConfusionsResponse {
    pub confusions: Vec<Confusion>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// POST /confusions
///
/// Submit an anonymous confusion to an existing room. Blank details are
/// treated as absent.
pub async fn submit_confusion(
    State(state): State<AppState>,
    Json(request): Json<SubmitConfusionRequest>,
) -> Result<Json<ConfusionResponse>, ApiError> {
    let room_id = trimmed(&request.room_id);
    let topic = trimmed(&request.topic);
    if room_id.is_empty() || topic.is_empty() {
        return Err(Error::InvalidInput("Room ID and topic are required".to_string()).into());
    }
    let details = Some(trimmed(&request.details).to_string()).filter(|d| !d.is_empty());

    let confusion = state.confusions.submit(room_id, topic, details).await?;
    Ok(Json(ConfusionResponse { confusion }))
}

/// GET /rooms/:room_id/confusions
///
/// All confusions for a room, newest first.
pub async fn list_confusions(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<ConfusionsResponse>, ApiError> {
    let confusions = state.confusions.list_for_room(&room_id).await?;
    Ok(Json(ConfusionsResponse { confusions }))
}

/// DELETE /confusions/:key
///
/// Teacher moderation: remove one entry by its store key. Idempotent.
pub async fn delete_confusion(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.confusions.delete(&key).await?;
    Ok(Json(DeleteResponse { success: true }))
}
