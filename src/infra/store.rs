use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{ClientError, ClientResult};

/// Small persistent key-value state shared by the clients (tokens, cached
/// responses).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value) -> ClientResult<()>;
}

/// A JSON object on disk, written through on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
    // Held for the whole write so snapshots land on disk in `set` order.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn load(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<Map<String, Value>>(&content).ok())
            .unwrap_or_else(|| {
                tracing::debug!(path = %path.display(), "starting with an empty store");
                Map::new()
            });
        Self {
            path,
            entries: Mutex::new(entries),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn save(&self, content: String) -> ClientResult<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Store(e.to_string()))?;
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| ClientError::Store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value) -> ClientResult<()> {
        let _write = self.write_lock.lock().await;
        let content = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| ClientError::Store("store lock poisoned".to_string()))?;
            entries.insert(key.to_string(), value);
            serde_json::to_string_pretty(&*entries)?
        };
        self.save(content).await
    }
}
