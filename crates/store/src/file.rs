//! JSON-file-backed store backend.

use std::collections::HashMap;
use std::path::PathBuf;

use beacon_common::{AppError, AppResult};
use tokio::sync::RwLock;

use crate::kv::KeyValueStore;

/// Long-lived key-value store persisted as a single JSON object on disk.
///
/// The whole map is rewritten on every mutation, via a sibling temp file and
/// an atomic rename; a crash mid-write leaves the previous file intact, so a
/// reader never observes a torn registry.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries if the file exists.
    ///
    /// A missing file is an empty store. A corrupt file is also treated as
    /// empty: the engine's failure policy degrades toward "no popup shown",
    /// never toward a crash.
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Corrupt store file, starting empty");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                return Err(AppError::Storage(format!(
                    "Failed to read store file {}: {err}",
                    path.display()
                )));
            }
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create store directory: {e}")))?;
        }

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Serialize the current map and atomically replace the backing file.
    ///
    /// Callers must hold the write lock across this call so that file
    /// contents always match the in-memory map.
    async fn persist(&self, entries: &HashMap<String, String>) -> AppResult<()> {
        let raw = serde_json::to_string_pretty(entries)?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write store file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to replace store file: {e}")))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.set("ds_announcements", "[]").await.unwrap();
        }

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            store.get("ds_announcements").await.unwrap(),
            Some("[]".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(store.get("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, "not json at all").await.unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);

        // The store stays usable after the corrupt load.
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_remove_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.set("a", "1").await.unwrap();
            store.remove("a").await.unwrap();
        }

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }
}
