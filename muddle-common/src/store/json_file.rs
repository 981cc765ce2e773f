//! JSON-file-backed key-value store
//!
//! The whole namespace lives in one JSON document. A dedicated task owns
//! the file and its in-memory image; every operation, reads included, is a
//! request/response message to that task. Writes are therefore strictly
//! ordered and a write never begins until the previous write has been
//! persisted. No lock is exposed.
//!
//! This synchronizes a single process only. Two processes sharing the file
//! remain unsynchronized.

use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use super::KvStore;

enum StoreRequest {
    Get {
        key: String,
        reply: oneshot::Sender<Option<Value>>,
    },
    Set {
        key: String,
        value: Value,
        reply: oneshot::Sender<Result<()>>,
    },
    Delete {
        key: String,
        reply: oneshot::Sender<Result<()>>,
    },
    ScanByPrefix {
        prefix: String,
        reply: oneshot::Sender<Vec<Value>>,
    },
}

/// Handle to the writer task owning the store file
pub struct JsonFileStore {
    tx: mpsc::UnboundedSender<StoreRequest>,
}

impl JsonFileStore {
    /// Load (or create) the store file and spawn its writer task.
    ///
    /// A missing or empty file starts an empty store. A file with
    /// unreadable JSON does the same with a warning rather than refusing
    /// to start.
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, Value>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        "Store file {} is not valid JSON ({}); starting empty",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Loaded {} entries from {}", entries.len(), path.display());

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(path, entries, rx));

        Ok(Self { tx })
    }

    fn send(&self, request: StoreRequest) -> Result<()> {
        self.tx.send(request).map_err(|_| writer_gone())
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreRequest::Get {
            key: key.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| writer_gone())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreRequest::Set {
            key: key.to_string(),
            value,
            reply,
        })?;
        rx.await.map_err(|_| writer_gone())?
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreRequest::Delete {
            key: key.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| writer_gone())?
    }

    async fn scan_by_prefix(&self, prefix: &str) -> Result<Vec<Value>> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreRequest::ScanByPrefix {
            prefix: prefix.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| writer_gone())
    }
}

fn writer_gone() -> Error {
    Error::Internal("store writer task is no longer running".to_string())
}

async fn run_writer(
    path: PathBuf,
    mut entries: HashMap<String, Value>,
    mut rx: mpsc::UnboundedReceiver<StoreRequest>,
) {
    while let Some(request) = rx.recv().await {
        match request {
            StoreRequest::Get { key, reply } => {
                let _ = reply.send(entries.get(&key).cloned());
            }
            StoreRequest::Set { key, value, reply } => {
                entries.insert(key, value);
                let result = persist(&path, &entries).await;
                if let Err(e) = &result {
                    error!("Failed to persist store file {}: {}", path.display(), e);
                }
                let _ = reply.send(result);
            }
            StoreRequest::Delete { key, reply } => {
                let result = if entries.remove(&key).is_some() {
                    persist(&path, &entries).await
                } else {
                    // Absent key: nothing to write
                    Ok(())
                };
                let _ = reply.send(result);
            }
            StoreRequest::ScanByPrefix { prefix, reply } => {
                let values = entries
                    .iter()
                    .filter(|(key, _)| key.starts_with(&prefix))
                    .map(|(_, value)| value.clone())
                    .collect();
                let _ = reply.send(values);
            }
        }
    }

    debug!("Store writer for {} shut down", path.display());
}

/// Rewrite the whole document. The next request is not served until this
/// completes, which is what serializes writes.
async fn persist(path: &Path, entries: &HashMap<String, Value>) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(entries)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
