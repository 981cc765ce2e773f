//! muddle-server library - classroom confusion feedback service
//!
//! Teachers create rooms, students anonymously post what confused them,
//! and Gemini is asked to summarize the accumulated entries for the
//! teacher.

use axum::routing::{delete, get, post};
use axum::Router;
use muddle_common::store::KvStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod confusion_log;
pub mod error;
pub mod registry;
pub mod services;

use confusion_log::ConfusionLog;
use registry::RoomRegistry;
use services::{GeminiClient, SummaryService};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomRegistry,
    pub confusions: ConfusionLog,
    pub summaries: SummaryService,
}

impl AppState {
    /// Wire the services over one store handle
    pub fn new(store: Arc<dyn KvStore>, client: GeminiClient) -> Self {
        let rooms = RoomRegistry::new(store.clone());
        let confusions = ConfusionLog::new(store.clone(), rooms.clone());
        let summaries = SummaryService::new(store, rooms.clone(), confusions.clone(), client);
        Self {
            rooms,
            confusions,
            summaries,
        }
    }
}

/// Build the application router
///
/// Public so integration tests can drive the routes without binding a
/// socket.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/rooms", post(api::create_room).get(api::rooms_ping))
        .route("/rooms/:room_id", get(api::get_room))
        .route("/rooms/:room_id/confusions", get(api::list_confusions))
        .route("/rooms/:room_id/summarize", post(api::summarize_room))
        .route("/rooms/:room_id/summaries", get(api::list_summaries))
        .route("/confusions", post(api::submit_confusion))
        .route("/confusions/:key", delete(api::delete_confusion))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Browser clients are served from another origin
        .layer(CorsLayer::permissive())
}
