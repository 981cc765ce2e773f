//! External service adapters

pub mod gemini_client;
pub mod summarizer;

pub use gemini_client::GeminiClient;
pub use summarizer::{SummaryResult, SummaryService};
