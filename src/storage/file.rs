use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{KeyValueStore, StorageError, StoredEntry};
use crate::clock::Clock;

/// Store kept as a single JSON document on disk.
///
/// The whole document is rewritten on every change through a temp file
/// and a rename.
pub struct FileStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

type Document = HashMap<String, StoredEntry>;

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Document, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Document::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }

    async fn save(&self, document: &Document) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }

        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, bytes)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        let now = self.clock.now();

        match document.get(key) {
            Some(entry) if entry.is_expired(now) => {
                debug!(key, "Purging expired entry");
                document.remove(key);
                self.save(&document).await?;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        document.insert(key.to_string(), StoredEntry::new(value, self.clock.now(), ttl));
        self.save(&document).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;
        if document.remove(key).is_some() {
            self.save(&document).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_values_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("store.json");
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()));

        let store = FileStore::new(&path, clock.clone());
        store.set("form_firstName", "Jane".into(), Some(Duration::from_secs(3600))).await.unwrap();
        store.set("order_total", "2072".into(), None).await.unwrap();
        drop(store);

        let reopened = FileStore::new(&path, clock.clone());
        assert_eq!(reopened.get("form_firstName").await.unwrap().as_deref(), Some("Jane"));
        assert_eq!(reopened.get("order_total").await.unwrap().as_deref(), Some("2072"));

        clock.advance(chrono::Duration::hours(2));
        assert_eq!(reopened.get("form_firstName").await.unwrap(), None);
        assert_eq!(reopened.get("order_total").await.unwrap().as_deref(), Some("2072"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileStore::new(&path, Arc::new(ManualClock::new(Utc::now())));
        assert!(matches!(store.get("k").await, Err(StorageError::Serialization(_))));
    }
}
