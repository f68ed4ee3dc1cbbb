//! Announcement registry repository.

use beacon_common::AppResult;
use tracing::{debug, warn};

use crate::entities::Announcement;
use crate::keys;
use crate::kv::SharedStore;

/// Repository for the announcement registry.
///
/// The registry is one ordered JSON list under a single key; every write
/// replaces the full list, so activation changes land as one logical update.
#[derive(Clone)]
pub struct AnnouncementRepository {
    persistent: SharedStore,
}

impl AnnouncementRepository {
    /// Create a new announcement repository.
    #[must_use]
    pub fn new(persistent: SharedStore) -> Self {
        Self { persistent }
    }

    /// Load the registry.
    ///
    /// Individual elements that do not parse as announcements are skipped;
    /// a registry value that is not a JSON array loads as empty. Backend
    /// read failures propagate (the admin surface reports them; the
    /// visitor-facing path degrades separately via [`Self::find_active`]).
    pub async fn load(&self) -> AppResult<Vec<Announcement>> {
        let Some(raw) = self.persistent.get(keys::ANNOUNCEMENTS).await? else {
            return Ok(Vec::new());
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(err) => {
                warn!(error = %err, "Registry is not a JSON list, treating as empty");
                return Ok(Vec::new());
            }
        };

        let announcements = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(announcement) => Some(announcement),
                Err(err) => {
                    debug!(error = %err, "Skipping malformed registry record");
                    None
                }
            })
            .collect();

        Ok(announcements)
    }

    /// Replace the registry with `announcements`, as one write.
    pub async fn save(&self, announcements: &[Announcement]) -> AppResult<()> {
        let raw = serde_json::to_string(announcements)?;
        self.persistent.set(keys::ANNOUNCEMENTS, &raw).await
    }

    /// The first active record in list order, if any.
    ///
    /// Selection is "first match", not "only match", so behavior stays
    /// defined even if a storage race ever left two records active. This
    /// read is visitor-facing and fails open: an unreadable registry means
    /// no active announcement.
    pub async fn find_active(&self) -> Option<Announcement> {
        match self.load().await {
            Ok(announcements) => announcements.into_iter().find(|a| a.is_active),
            Err(err) => {
                warn!(error = %err, "Registry unreadable, no active announcement");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::MemoryStore;
    use crate::entities::{AnnouncementKind, Frequency, TriggerKind};

    fn announcement(id: &str, is_active: bool) -> Announcement {
        Announcement {
            id: id.to_string(),
            title: "Title".to_string(),
            message: "Message".to_string(),
            image: None,
            cta_text: None,
            cta_link: None,
            is_active,
            kind: AnnouncementKind::Info,
            trigger_type: TriggerKind::Timer,
            trigger_value: 3,
            frequency: Frequency::Session,
        }
    }

    fn repo_with(raw: &str) -> AnnouncementRepository {
        AnnouncementRepository::new(Arc::new(MemoryStore::with_entries([(
            keys::ANNOUNCEMENTS,
            raw,
        )])))
    }

    #[tokio::test]
    async fn test_load_empty_when_key_absent() {
        let repo = AnnouncementRepository::new(Arc::new(MemoryStore::new()));
        assert!(repo.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let repo = AnnouncementRepository::new(Arc::new(MemoryStore::new()));
        let list = vec![announcement("a1", false), announcement("a2", true)];

        repo.save(&list).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), list);
    }

    #[tokio::test]
    async fn test_load_skips_malformed_records() {
        let repo = repo_with(
            r#"[
                {"id":"a1","title":"T","message":"M","isActive":false,
                 "type":"info","triggerType":"timer","triggerValue":3,"frequency":"session"},
                {"garbage": true},
                42
            ]"#,
        );

        let list = repo.load().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "a1");
    }

    #[tokio::test]
    async fn test_load_non_array_is_empty() {
        let repo = repo_with("{\"not\": \"a list\"}");
        assert!(repo.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_active_picks_first_in_list_order() {
        // Two records active at once (simulated storage race): the first in
        // list order wins.
        let repo = AnnouncementRepository::new(Arc::new(MemoryStore::new()));
        repo.save(&[announcement("a1", true), announcement("a2", true)])
            .await
            .unwrap();

        let active = repo.find_active().await.unwrap();
        assert_eq!(active.id, "a1");
    }

    #[tokio::test]
    async fn test_find_active_none_when_all_inactive() {
        let repo = AnnouncementRepository::new(Arc::new(MemoryStore::new()));
        repo.save(&[announcement("a1", false)]).await.unwrap();
        assert!(repo.find_active().await.is_none());
    }
}
