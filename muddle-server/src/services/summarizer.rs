//! Summary service
//!
//! Formats a room's accumulated confusions into a prompt, asks Gemini for
//! a summary, and stores the result as a historical record.

use crate::confusion_log::ConfusionLog;
use crate::registry::RoomRegistry;
use crate::services::gemini_client::GeminiClient;
use chrono::Utc;
use muddle_common::model::{Confusion, Summary};
use muddle_common::store::{keys, KvStore};
use muddle_common::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Fixed reply for rooms with no submissions; no API call is made
pub const EMPTY_ROOM_SUMMARY: &str = "No confusion submissions yet for this room.";

/// Per-entry cap on details text embedded in the prompt
const MAX_DETAIL_CHARS: usize = 500;

/// Outcome of a summarize call
#[derive(Debug, Clone)]
pub struct SummaryResult {
    pub text: String,
    pub confusion_count: usize,
}

#[derive(Clone)]
pub struct SummaryService {
    store: Arc<dyn KvStore>,
    rooms: RoomRegistry,
    confusions: ConfusionLog,
    client: GeminiClient,
}

impl SummaryService {
    pub fn new(
        store: Arc<dyn KvStore>,
        rooms: RoomRegistry,
        confusions: ConfusionLog,
        client: GeminiClient,
    ) -> Self {
        Self {
            store,
            rooms,
            confusions,
            client,
        }
    }

    /// Summarize a room's confusions.
    ///
    /// The credential check comes first: without an API key this fails even
    /// for empty rooms. An empty room gets the canned result without an API
    /// call and without storing anything; a room id that was never created
    /// has no entries, so it gets the canned result too.
    pub async fn summarize(&self, room_id: &str) -> Result<SummaryResult> {
        if !self.client.has_api_key() {
            return Err(Error::Upstream(
                "Gemini API key not configured".to_string(),
            ));
        }

        let mut entries = self.confusions.entries_for_room(room_id).await?;
        if entries.is_empty() {
            return Ok(SummaryResult {
                text: EMPTY_ROOM_SUMMARY.to_string(),
                confusion_count: 0,
            });
        }

        // Prompt entries run oldest first
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        let prompt = build_prompt(&entries);

        let text = self
            .client
            .generate(&prompt)
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        let summary = Summary {
            text: text.clone(),
            confusion_count: entries.len(),
            generated_at: Utc::now(),
        };
        let key = keys::summary_key(room_id, summary.generated_at);
        self.store.set(&key, serde_json::to_value(&summary)?).await?;

        info!(
            "Generated summary for room {} from {} confusions",
            room_id,
            entries.len()
        );

        Ok(SummaryResult {
            text,
            confusion_count: summary.confusion_count,
        })
    }

    /// Stored summaries for an existing room, newest first
    pub async fn list_for_room(&self, room_id: &str) -> Result<Vec<Summary>> {
        self.rooms.require(room_id).await?;

        let values = self
            .store
            .scan_by_prefix(&keys::summary_prefix(room_id))
            .await?;
        let mut summaries: Vec<Summary> = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!("Skipping undecodable summary record: {}", e);
                    None
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));

        Ok(summaries)
    }
}

/// Numbered `Topic:`/`Details:` entries wrapped in the analysis request
/// shown to the model
fn build_prompt(entries: &[Confusion]) -> String {
    let confusion_texts = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut item = format!("{}. Topic: {}", i + 1, entry.topic);
            if let Some(details) = &entry.details {
                let bounded: String = details.chars().take(MAX_DETAIL_CHARS).collect();
                item.push_str(&format!("\n   Details: {}", bounded));
            }
            item
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an educational assistant helping a teacher understand student confusion patterns.\n\n\
         Below are {} anonymous confusion submissions from students in a class:\n\n\
         {}\n\n\
         Please analyze these submissions and provide:\n\
         1. Main themes or topics students are confused about (group similar confusions together)\n\
         2. The most common areas of confusion\n\
         3. A brief summary for the teacher on what to focus on\n\n\
         Format your response in a clear, actionable way that helps the teacher address student needs.",
        entries.len(),
        confusion_texts
    )
}
