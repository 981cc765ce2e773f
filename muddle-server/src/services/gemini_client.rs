//! Gemini API client
//!
//! Thin wrapper over the `generateContent` REST endpoint: one free-text
//! prompt in, one free-text reply out. The endpoint base is injectable so
//! tests can point the client at a local stub server.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini client errors
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Gemini API key not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Gemini API error {0}: {1}")]
    ApiStatus(u16, String),

    #[error("Malformed response body: {0}")]
    Parse(String),
}

/// Client for the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, model, DEFAULT_ENDPOINT)
    }

    /// Client against an alternate endpoint base (local stubs in tests)
    pub fn with_endpoint(
        api_key: Option<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send one prompt and extract the generated text from whichever
    /// response shape comes back
    pub async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Calling Gemini API");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::ApiStatus(status.as_u16(), body));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| GeminiError::Parse(e.to_string()))?;

        // When no text can be extracted, hand back the raw body rather
        // than failing
        Ok(extract_text(&raw).unwrap_or_else(|| raw.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

/// Known response shapes, tried in declaration order
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplyShape {
    Candidates(CandidatesReply),
    Direct(DirectReply),
}

#[derive(Debug, Deserialize)]
struct CandidatesReply {
    candidates: Vec<ReplyCandidate>,
}

#[derive(Debug, Deserialize)]
struct ReplyCandidate {
    content: ReplyContent,
}

#[derive(Debug, Deserialize)]
struct ReplyContent {
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectReply {
    text: String,
}

/// First extractable text from the first candidate, if any
fn extract_text(raw: &Value) -> Option<String> {
    match serde_json::from_value::<ReplyShape>(raw.clone()).ok()? {
        ReplyShape::Candidates(reply) => reply
            .candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .find_map(|part| part.text),
        ReplyShape::Direct(reply) => Some(reply.text),
    }
}
