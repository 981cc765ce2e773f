//! Integration tests for muddle-server API endpoints
//!
//! Tests cover:
//! - Room creation, lookup, validation and duplicate handling
//! - Confusion submission, listing order, scoping and deletion
//! - AI summarization against a local stub Gemini endpoint
//! - Health and liveness endpoints
//!
//! Summarization tests never reach the real Gemini API: the client is
//! constructed with its endpoint pointed at a stub server bound to
//! 127.0.0.1.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::post,
    Json, Router,
};
use muddle_common::store::{init_store_database, JsonFileStore, KvStore, SqliteStore};
use muddle_server::services::gemini_client::{GeminiClient, DEFAULT_MODEL};
use muddle_server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: sqlite-backed store in a fresh temp folder
async fn setup_store(dir: &tempfile::TempDir) -> Arc<dyn KvStore> {
    let pool = init_store_database(&dir.path().join("muddle.db"))
        .await
        .expect("Should init store database");
    Arc::new(SqliteStore::new(pool))
}

/// Test helper: app with no Gemini credential configured
async fn setup_app(dir: &tempfile::TempDir) -> Router {
    let client = GeminiClient::new(None, DEFAULT_MODEL);
    build_router(AppState::new(setup_store(dir).await, client))
}

/// Test helper: app whose Gemini client points at a local stub endpoint
async fn setup_app_with_gemini(dir: &tempfile::TempDir, endpoint: &str) -> Router {
    let client = GeminiClient::with_endpoint(Some("test-key".to_string()), DEFAULT_MODEL, endpoint);
    build_router(AppState::new(setup_store(dir).await, client))
}

/// Test helper: bodyless request
fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: JSON request
fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: create a room and return the response body
async fn create_room(app: &Router, room_id: &str, room_name: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/rooms",
            json!({"roomId": room_id, "roomName": room_name}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

/// Test helper: submit a confusion and return the stored entry
async fn submit_confusion(
    app: &Router,
    room_id: &str,
    topic: &str,
    details: Option<&str>,
) -> Value {
    let mut body = json!({"roomId": room_id, "topic": topic});
    if let Some(details) = details {
        body["details"] = json!(details);
    }
    let response = app
        .clone()
        .oneshot(json_request("POST", "/confusions", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

/// Spawn a stub Gemini endpoint returning `status`/`body`, counting hits
async fn spawn_stub_gemini(status: StatusCode, body: Value) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = hits.clone();

    let app = Router::new().route(
        "/models/:call",
        post(move || {
            let hits = handler_hits.clone();
            let body = body.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (status, Json(body))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind stub listener");
    let addr = listener.local_addr().expect("Should read stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Should serve stub");
    });

    (format!("http://{}", addr), hits)
}

/// Canned candidate-shaped Gemini reply
fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    })
}

// =============================================================================
// Health & liveness
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "muddle-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_rooms_ping_returns_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    let response = app.oneshot(test_request("GET", "/rooms")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({ "ok": true }));
}

// =============================================================================
// Room registry
// =============================================================================

#[tokio::test]
async fn test_create_room_returns_full_record() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/rooms",
            json!({"roomId": "CS101", "roomName": "Intro CS", "teacherName": "Dr. Mills"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["room"]["id"], "CS101");
    assert_eq!(body["room"]["name"], "Intro CS");
    assert_eq!(body["room"]["teacherName"], "Dr. Mills");
    assert!(body["room"]["createdAt"].is_string());
}

#[tokio::test]
async fn test_create_room_defaults_teacher_name() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    let body = create_room(&app, "CS101", "Intro CS").await;
    assert_eq!(body["room"]["teacherName"], "Anonymous Teacher");
}

#[tokio::test]
async fn test_create_room_trims_whitespace() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/rooms",
            json!({"roomId": "  CS101  ", "roomName": "  Intro CS  ", "teacherName": "   "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["room"]["id"], "CS101");
    assert_eq!(body["room"]["name"], "Intro CS");
    // Blank teacher name collapses to the default
    assert_eq!(body["room"]["teacherName"], "Anonymous Teacher");

    // The trimmed id is the one that was stored
    let response = app
        .oneshot(test_request("GET", "/rooms/CS101"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_room_requires_id_and_name() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    for body in [
        json!({}),
        json!({"roomId": "CS101"}),
        json!({"roomName": "Intro CS"}),
        json!({"roomId": "   ", "roomName": "Intro CS"}),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/rooms", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "Room ID and name are required");
    }
}

#[tokio::test]
async fn test_duplicate_room_id_rejected_and_original_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    create_room(&app, "CS101", "Intro CS").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/rooms",
            json!({"roomId": "CS101", "roomName": "Other Name"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Room ID already exists");

    // First writer wins: the original record is intact
    let response = app
        .oneshot(test_request("GET", "/rooms/CS101"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["room"]["name"], "Intro CS");
}

#[tokio::test]
async fn test_room_id_with_colon_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/rooms",
            json!({"roomId": "CS:101", "roomName": "Intro CS"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_room_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    let response = app
        .oneshot(test_request("GET", "/rooms/NOPE"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Room not found");
}

// =============================================================================
// Confusion log
// =============================================================================

#[tokio::test]
async fn test_submit_confusion_returns_entry_with_key() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    create_room(&app, "CS101", "Intro CS").await;
    let body = submit_confusion(&app, "CS101", "Recursion", None).await;

    let confusion = &body["confusion"];
    assert!(confusion["id"].is_string());
    assert_eq!(confusion["roomId"], "CS101");
    assert_eq!(confusion["topic"], "Recursion");
    assert!(confusion["timestamp"].is_string());
    // Details omitted entirely when absent
    assert!(confusion.get("details").is_none());

    let key = confusion["key"].as_str().unwrap();
    assert!(key.starts_with("confusion:CS101:"));
}

#[tokio::test]
async fn test_submit_confusion_keeps_details() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    create_room(&app, "CS101", "Intro CS").await;
    let body = submit_confusion(&app, "CS101", "Pointers", Some("Confusing syntax")).await;
    assert_eq!(body["confusion"]["details"], "Confusing syntax");
}

#[tokio::test]
async fn test_submit_confusion_drops_blank_details() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    create_room(&app, "CS101", "Intro CS").await;
    let body = submit_confusion(&app, "CS101", "Recursion", Some("   ")).await;
    assert!(body["confusion"].get("details").is_none());
}

#[tokio::test]
async fn test_submit_requires_room_and_topic() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    create_room(&app, "CS101", "Intro CS").await;

    for body in [
        json!({}),
        json!({"roomId": "CS101"}),
        json!({"topic": "Recursion"}),
        json!({"roomId": "CS101", "topic": "  "}),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/confusions", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "Room ID and topic are required");
    }
}

#[tokio::test]
async fn test_submit_to_unknown_room_is_404_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/confusions",
            json!({"roomId": "CS101", "topic": "Recursion"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Creating the room afterwards shows no orphaned entry
    create_room(&app, "CS101", "Intro CS").await;
    let response = app
        .oneshot(test_request("GET", "/rooms/CS101/confusions"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["confusions"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_list_confusions_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    create_room(&app, "CS101", "Intro CS").await;
    submit_confusion(&app, "CS101", "First", None).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    submit_confusion(&app, "CS101", "Second", None).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    submit_confusion(&app, "CS101", "Third", None).await;

    let response = app
        .oneshot(test_request("GET", "/rooms/CS101/confusions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let confusions = body["confusions"].as_array().unwrap();
    assert_eq!(confusions.len(), 3);
    assert_eq!(confusions[0]["topic"], "Third");
    assert_eq!(confusions[1]["topic"], "Second");
    assert_eq!(confusions[2]["topic"], "First");
}

#[tokio::test]
async fn test_list_confusions_scoped_to_room() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    create_room(&app, "CS101", "Intro CS").await;
    create_room(&app, "MATH200", "Calculus").await;
    submit_confusion(&app, "CS101", "Recursion", None).await;
    submit_confusion(&app, "MATH200", "Limits", None).await;

    let response = app
        .oneshot(test_request("GET", "/rooms/MATH200/confusions"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let confusions = body["confusions"].as_array().unwrap();
    assert_eq!(confusions.len(), 1);
    assert_eq!(confusions[0]["topic"], "Limits");
}

#[tokio::test]
async fn test_list_confusions_unknown_room_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    let response = app
        .oneshot(test_request("GET", "/rooms/NOPE/confusions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_confusion_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    create_room(&app, "CS101", "Intro CS").await;
    let body = submit_confusion(&app, "CS101", "Recursion", None).await;
    let key = body["confusion"]["key"].as_str().unwrap().to_string();

    let uri = format!("/confusions/{}", key);
    let response = app.clone().oneshot(test_request("DELETE", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);

    // Entry is gone
    let response = app
        .clone()
        .oneshot(test_request("GET", "/rooms/CS101/confusions"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["confusions"].as_array().unwrap().len(), 0);

    // Deleting again still reports success
    let response = app.oneshot(test_request("DELETE", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);
}

// =============================================================================
// Summarization (stubbed Gemini)
// =============================================================================

#[tokio::test]
async fn test_summarize_without_api_key_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    create_room(&app, "CS101", "Intro CS").await;
    submit_confusion(&app, "CS101", "Recursion", None).await;

    let response = app
        .oneshot(test_request("POST", "/rooms/CS101/summarize"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Gemini API key not configured");
}

#[tokio::test]
async fn test_summarize_empty_room_returns_placeholder_without_api_call() {
    let (endpoint, hits) = spawn_stub_gemini(StatusCode::OK, gemini_reply("unused")).await;
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app_with_gemini(&dir, &endpoint).await;

    create_room(&app, "CS101", "Intro CS").await;

    let response = app
        .clone()
        .oneshot(test_request("POST", "/rooms/CS101/summarize"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["summary"], "No confusion submissions yet for this room.");
    assert_eq!(body["confusionCount"], 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    // Placeholder results are not recorded
    let response = app
        .oneshot(test_request("GET", "/rooms/CS101/summaries"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["summaries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_summarize_unknown_room_gets_placeholder() {
    let (endpoint, hits) = spawn_stub_gemini(StatusCode::OK, gemini_reply("unused")).await;
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app_with_gemini(&dir, &endpoint).await;

    // No room was ever created; there are no entries to summarize
    let response = app
        .oneshot(test_request("POST", "/rooms/GHOST/summarize"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["summary"], "No confusion submissions yet for this room.");
    assert_eq!(body["confusionCount"], 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_summarize_returns_generated_text_and_persists_record() {
    let (endpoint, hits) =
        spawn_stub_gemini(StatusCode::OK, gemini_reply("Focus on recursion basics.")).await;
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app_with_gemini(&dir, &endpoint).await;

    create_room(&app, "CS101", "Intro CS").await;
    submit_confusion(&app, "CS101", "Recursion", None).await;
    submit_confusion(&app, "CS101", "Pointers", Some("Confusing syntax")).await;

    let response = app
        .clone()
        .oneshot(test_request("POST", "/rooms/CS101/summarize"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["summary"], "Focus on recursion basics.");
    assert_eq!(body["confusionCount"], 2);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // The generated summary is stored for later retrieval
    let response = app
        .oneshot(test_request("GET", "/rooms/CS101/summaries"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let summaries = body["summaries"].as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["text"], "Focus on recursion basics.");
    assert_eq!(summaries[0]["confusionCount"], 2);
    assert!(summaries[0]["generatedAt"].is_string());
}

#[tokio::test]
async fn test_summarize_upstream_error_is_500_and_persists_nothing() {
    let (endpoint, _hits) =
        spawn_stub_gemini(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})).await;
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app_with_gemini(&dir, &endpoint).await;

    create_room(&app, "CS101", "Intro CS").await;
    submit_confusion(&app, "CS101", "Recursion", None).await;

    let response = app
        .clone()
        .oneshot(test_request("POST", "/rooms/CS101/summarize"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Gemini API error"));

    let response = app
        .oneshot(test_request("GET", "/rooms/CS101/summaries"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["summaries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_list_summaries_unknown_room_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app(&dir).await;

    let response = app
        .oneshot(test_request("GET", "/rooms/NOPE/summaries"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// JSON file backend behind the same API
// =============================================================================

#[tokio::test]
async fn test_json_store_backend_serves_the_same_api() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KvStore> = Arc::new(
        JsonFileStore::open(dir.path().join("store.json"))
            .await
            .expect("Should open json store"),
    );
    let client = GeminiClient::new(None, DEFAULT_MODEL);
    let app = build_router(AppState::new(store, client));

    create_room(&app, "CS101", "Intro CS").await;
    submit_confusion(&app, "CS101", "Recursion", None).await;

    let response = app
        .oneshot(test_request("GET", "/rooms/CS101/confusions"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["confusions"].as_array().unwrap().len(), 1);
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[tokio::test]
async fn test_classroom_scenario_end_to_end() {
    let (endpoint, _hits) = spawn_stub_gemini(
        StatusCode::OK,
        gemini_reply("Students struggle most with recursion and pointer syntax."),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let app = setup_app_with_gemini(&dir, &endpoint).await;

    // Teacher creates the room
    create_room(&app, "CS101", "Intro CS").await;

    // Students submit anonymously
    submit_confusion(&app, "CS101", "Recursion", None).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    submit_confusion(&app, "CS101", "Pointers", Some("Confusing syntax")).await;

    // Teacher lists entries, newest first
    let response = app
        .clone()
        .oneshot(test_request("GET", "/rooms/CS101/confusions"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let confusions = body["confusions"].as_array().unwrap();
    assert_eq!(confusions.len(), 2);
    assert_eq!(confusions[0]["topic"], "Pointers");
    assert_eq!(confusions[1]["topic"], "Recursion");

    // Teacher requests the AI summary
    let response = app
        .oneshot(test_request("POST", "/rooms/CS101/summarize"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body["summary"],
        "Students struggle most with recursion and pointer syntax."
    );
    assert_eq!(body["confusionCount"], 2);
}
