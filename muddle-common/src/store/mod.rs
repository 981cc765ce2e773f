//! Key-value store abstraction
//!
//! Rooms, confusions and summaries share one durable namespace (see
//! [`keys`]) with two interchangeable backends: a SQLite table and a JSON
//! document owned by a single writer task.

pub mod json_file;
pub mod keys;
pub mod sqlite;

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use json_file::JsonFileStore;
pub use sqlite::{init_store_database, SqliteStore};

/// Get/set/delete/prefix-scan over one durable namespace.
///
/// Scan order is unspecified; callers sort. Storage failures surface as
/// errors and are treated as fatal for the current request.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`; deleting an absent key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// All values whose key starts with `prefix`, in unspecified order
    async fn scan_by_prefix(&self, prefix: &str) -> Result<Vec<Value>>;
}
