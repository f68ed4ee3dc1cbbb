//! Content collection repository.
//!
//! The console also manages plain content lists (news posts, job listings,
//! training and gallery images). These are direct-manipulation CRUD with no
//! invariants beyond "list contains the edited/added/removed record", so one
//! generic repository over opaque JSON records covers all four.

use beacon_common::{AppError, AppResult, IdGenerator};
use serde_json::Value;
use tracing::warn;

use crate::keys;
use crate::kv::SharedStore;

/// The content collections the console manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentCollection {
    /// News posts.
    News,
    /// Job listings.
    Jobs,
    /// Training images.
    TrainingImages,
    /// Gallery images.
    Gallery,
}

impl ContentCollection {
    /// Storage key of this collection.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::News => keys::NEWS,
            Self::Jobs => keys::JOBS,
            Self::TrainingImages => keys::TRAINING_IMAGES,
            Self::Gallery => keys::GALLERY,
        }
    }

    /// Parse a collection from its URL segment.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "news" => Some(Self::News),
            "jobs" => Some(Self::Jobs),
            "training-images" => Some(Self::TrainingImages),
            "gallery" => Some(Self::Gallery),
            _ => None,
        }
    }
}

/// Repository for the content collections.
#[derive(Clone)]
pub struct ContentRepository {
    persistent: SharedStore,
    id_gen: IdGenerator,
}

impl ContentRepository {
    /// Create a new content repository.
    #[must_use]
    pub fn new(persistent: SharedStore) -> Self {
        Self {
            persistent,
            id_gen: IdGenerator::new(),
        }
    }

    /// List the records in `collection`, newest first.
    pub async fn list(&self, collection: ContentCollection) -> AppResult<Vec<Value>> {
        let Some(raw) = self.persistent.get(collection.key()).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!(key = collection.key(), error = %err, "Collection is not a JSON list, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Add a record to `collection` with a generated `id`, prepending it.
    pub async fn add(&self, collection: ContentCollection, mut record: Value) -> AppResult<Value> {
        let fields = record
            .as_object_mut()
            .ok_or_else(|| AppError::BadRequest("Record must be a JSON object".to_string()))?;
        fields.insert("id".to_string(), Value::String(self.id_gen.generate()));

        let mut records = self.list(collection).await?;
        records.insert(0, record.clone());
        self.save(collection, &records).await?;

        Ok(record)
    }

    /// Replace the record with `id`, keeping its position.
    pub async fn update(
        &self,
        collection: ContentCollection,
        id: &str,
        mut record: Value,
    ) -> AppResult<Value> {
        let fields = record
            .as_object_mut()
            .ok_or_else(|| AppError::BadRequest("Record must be a JSON object".to_string()))?;
        fields.insert("id".to_string(), Value::String(id.to_string()));

        let mut records = self.list(collection).await?;
        let slot = records
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| AppError::NotFound(format!("Record not found: {id}")))?;
        *slot = record.clone();
        self.save(collection, &records).await?;

        Ok(record)
    }

    /// Remove the record with `id`.
    pub async fn remove(&self, collection: ContentCollection, id: &str) -> AppResult<()> {
        let mut records = self.list(collection).await?;
        let before = records.len();
        records.retain(|r| r.get("id").and_then(Value::as_str) != Some(id));

        if records.len() == before {
            return Err(AppError::NotFound(format!("Record not found: {id}")));
        }

        self.save(collection, &records).await
    }

    async fn save(&self, collection: ContentCollection, records: &[Value]) -> AppResult<()> {
        let raw = serde_json::to_string(records)?;
        self.persistent.set(collection.key(), &raw).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::MemoryStore;

    fn repo() -> ContentRepository {
        ContentRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_add_assigns_id_and_prepends() {
        let repo = repo();

        repo.add(ContentCollection::News, json!({"title": "First"}))
            .await
            .unwrap();
        let added = repo
            .add(ContentCollection::News, json!({"title": "Second"}))
            .await
            .unwrap();

        assert!(added.get("id").and_then(Value::as_str).is_some());

        let records = repo.list(ContentCollection::News).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["title"], "Second");
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let repo = repo();
        let added = repo
            .add(ContentCollection::Jobs, json!({"title": "Engineer"}))
            .await
            .unwrap();
        let id = added["id"].as_str().unwrap().to_string();

        repo.add(ContentCollection::Jobs, json!({"title": "Designer"}))
            .await
            .unwrap();
        repo.update(ContentCollection::Jobs, &id, json!({"title": "Sr. Engineer"}))
            .await
            .unwrap();

        let records = repo.list(ContentCollection::Jobs).await.unwrap();
        assert_eq!(records[1]["title"], "Sr. Engineer");
        assert_eq!(records[1]["id"], id.as_str());
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let repo = repo();
        let err = repo
            .remove(ContentCollection::Gallery, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let repo = repo();
        repo.add(ContentCollection::News, json!({"title": "N"}))
            .await
            .unwrap();

        assert!(repo.list(ContentCollection::Jobs).await.unwrap().is_empty());
    }

    #[test]
    fn test_from_slug() {
        assert_eq!(
            ContentCollection::from_slug("training-images"),
            Some(ContentCollection::TrainingImages)
        );
        assert_eq!(ContentCollection::from_slug("bogus"), None);
    }
}
