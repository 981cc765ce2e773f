//! Summary endpoints

use axum::extract::{Path, State};
use axum::Json;
use muddle_common::model::Summary;
use serde::Serialize;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponse {
    pub summary: String,
    pub confusion_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SummariesResponse {
    pub summaries: Vec<Summary>,
}

/// POST /rooms/:room_id/summarize
///
/// Generate (and store) an AI summary of the room's confusions.
pub async fn summarize_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let result = state.summaries.summarize(&room_id).await?;
    Ok(Json(SummarizeResponse {
        summary: result.text,
        confusion_count: result.confusion_count,
    }))
}

/// GET /rooms/:room_id/summaries
///
/// Previously generated summaries for a room, newest first.
pub async fn list_summaries(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<SummariesResponse>, ApiError> {
    let summaries = state.summaries.list_for_room(&room_id).await?;
    Ok(Json(SummariesResponse { summaries }))
}
