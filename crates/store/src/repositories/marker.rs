//! Dismissal/shown marker repository.

use beacon_common::{AppError, AppResult};
use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;

use crate::keys;
use crate::kv::{SharedStore, StoreScopes};

/// Repository for per-announcement display markers.
///
/// Three marker kinds exist, one per frequency mode: a permanent flag and a
/// last-shown timestamp in the long-lived scope, and a dismissal flag in the
/// session-lived scope. Exactly one kind is consulted per announcement,
/// selected by that announcement's current frequency.
///
/// Reads honor an explicit fail-open policy: with `open_on_read_error` set
/// (the default), an unreadable or malformed marker counts as absent, so a
/// broken store favors showing the promotion over enforcing the cap.
#[derive(Clone)]
pub struct MarkerRepository {
    scopes: StoreScopes,
    visitor_namespace: String,
    session_namespace: String,
    open_on_read_error: bool,
}

impl MarkerRepository {
    /// Create a marker repository with the default fail-open policy and no
    /// visitor namespace (the original single-browser layout).
    #[must_use]
    pub fn new(scopes: StoreScopes) -> Self {
        Self::with_policy(scopes, true)
    }

    /// Create a marker repository with an explicit fail-open policy.
    #[must_use]
    pub fn with_policy(scopes: StoreScopes, open_on_read_error: bool) -> Self {
        Self {
            scopes,
            visitor_namespace: String::new(),
            session_namespace: String::new(),
            open_on_read_error,
        }
    }

    /// A view of this repository namespaced to one visitor and one browsing
    /// session, for serving many visitors from a single process.
    #[must_use]
    pub fn scoped(&self, visitor_id: &str, session_id: &str) -> Self {
        Self {
            scopes: self.scopes.clone(),
            visitor_namespace: keys::visitor_namespace(visitor_id),
            session_namespace: keys::session_namespace(session_id),
            open_on_read_error: self.open_on_read_error,
        }
    }

    /// Read a key, applying the fail-open policy to backend errors.
    async fn read(&self, store: &SharedStore, key: &str) -> AppResult<Option<String>> {
        match store.get(key).await {
            Ok(value) => Ok(value),
            Err(err) if self.open_on_read_error => {
                warn!(key, error = %err, "Marker unreadable, failing open");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Whether a permanent "don't show again" marker exists.
    pub async fn has_permanent(&self, announcement_id: &str) -> AppResult<bool> {
        let key = keys::permanent_marker(&self.visitor_namespace, announcement_id);
        Ok(self.read(&self.scopes.persistent, &key).await?.is_some())
    }

    /// Write the permanent marker.
    pub async fn set_permanent(&self, announcement_id: &str) -> AppResult<()> {
        let key = keys::permanent_marker(&self.visitor_namespace, announcement_id);
        self.scopes.persistent.set(&key, "true").await
    }

    /// When the announcement was last shown, if a daily marker exists.
    ///
    /// The timestamp is stored as an epoch-milliseconds string, the format
    /// the original console wrote. A malformed timestamp follows the
    /// fail-open policy.
    pub async fn daily_shown_at(&self, announcement_id: &str) -> AppResult<Option<DateTime<Utc>>> {
        let key = keys::daily_marker(&self.visitor_namespace, announcement_id);
        let Some(raw) = self.read(&self.scopes.persistent, &key).await? else {
            return Ok(None);
        };

        match raw.trim().parse::<i64>().ok().and_then(|ms| {
            Utc.timestamp_millis_opt(ms).single()
        }) {
            Some(at) => Ok(Some(at)),
            None if self.open_on_read_error => {
                warn!(key, "Malformed daily marker, failing open");
                Ok(None)
            }
            None => Err(AppError::Storage(format!(
                "Malformed daily marker under {key}"
            ))),
        }
    }

    /// Write/refresh the daily marker to `now`.
    pub async fn touch_daily(&self, announcement_id: &str, now: DateTime<Utc>) -> AppResult<()> {
        let key = keys::daily_marker(&self.visitor_namespace, announcement_id);
        self.scopes
            .persistent
            .set(&key, &now.timestamp_millis().to_string())
            .await
    }

    /// Whether a session dismissal marker exists.
    pub async fn has_session(&self, announcement_id: &str) -> AppResult<bool> {
        let key = keys::session_marker(&self.session_namespace, announcement_id);
        Ok(self.read(&self.scopes.session, &key).await?.is_some())
    }

    /// Write the session dismissal marker.
    pub async fn set_session(&self, announcement_id: &str) -> AppResult<()> {
        let key = keys::session_marker(&self.session_namespace, announcement_id);
        self.scopes.session.set(&key, "true").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::kv::KeyValueStore;
    use crate::{MemoryStore, StoreScopes};

    /// Store whose every read fails, for exercising the fail-open policy.
    struct BrokenStore;

    #[async_trait::async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> AppResult<Option<String>> {
            Err(AppError::Storage("disk on fire".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> AppResult<()> {
            Err(AppError::Storage("disk on fire".to_string()))
        }

        async fn remove(&self, _key: &str) -> AppResult<()> {
            Err(AppError::Storage("disk on fire".to_string()))
        }
    }

    fn broken_scopes() -> StoreScopes {
        StoreScopes::new(Arc::new(BrokenStore), Arc::new(BrokenStore))
    }

    #[tokio::test]
    async fn test_permanent_marker_roundtrip() {
        let markers = MarkerRepository::new(StoreScopes::in_memory());

        assert!(!markers.has_permanent("a1").await.unwrap());
        markers.set_permanent("a1").await.unwrap();
        assert!(markers.has_permanent("a1").await.unwrap());
        assert!(!markers.has_permanent("a2").await.unwrap());
    }

    #[tokio::test]
    async fn test_daily_marker_stores_epoch_millis() {
        let scopes = StoreScopes::in_memory();
        let markers = MarkerRepository::new(scopes.clone());
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        markers.touch_daily("a1", now).await.unwrap();

        // Wire format check: bare millis string, as the original wrote it.
        let raw = scopes
            .persistent
            .get("ds_announcement_daily_a1")
            .await
            .unwrap();
        assert_eq!(raw.as_deref(), Some("1700000000000"));
        assert_eq!(markers.daily_shown_at("a1").await.unwrap(), Some(now));
    }

    #[tokio::test]
    async fn test_session_marker_lives_in_session_scope() {
        let scopes = StoreScopes::in_memory();
        let markers = MarkerRepository::new(scopes.clone());

        markers.set_session("a1").await.unwrap();

        assert!(markers.has_session("a1").await.unwrap());
        assert_eq!(
            scopes
                .persistent
                .get("ds_announcement_dismissed_a1")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_reads_fail_open_by_default() {
        let markers = MarkerRepository::new(broken_scopes());

        assert!(!markers.has_permanent("a1").await.unwrap());
        assert!(markers.daily_shown_at("a1").await.unwrap().is_none());
        assert!(!markers.has_session("a1").await.unwrap());
    }

    #[tokio::test]
    async fn test_reads_fail_closed_when_policy_disabled() {
        let markers = MarkerRepository::with_policy(broken_scopes(), false);

        assert!(markers.has_permanent("a1").await.is_err());
        assert!(markers.daily_shown_at("a1").await.is_err());
        assert!(markers.has_session("a1").await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_daily_marker_fails_open() {
        let scopes = StoreScopes::new(
            Arc::new(MemoryStore::with_entries([(
                "ds_announcement_daily_a1",
                "yesterday-ish",
            )])),
            Arc::new(MemoryStore::new()),
        );

        let open = MarkerRepository::new(scopes.clone());
        assert!(open.daily_shown_at("a1").await.unwrap().is_none());

        let closed = MarkerRepository::with_policy(scopes, false);
        assert!(closed.daily_shown_at("a1").await.is_err());
    }

    #[tokio::test]
    async fn test_scoped_markers_are_isolated_per_visitor() {
        let base = MarkerRepository::new(StoreScopes::in_memory());
        let alice = base.scoped("alice", "s1");
        let bob = base.scoped("bob", "s2");

        alice.set_permanent("a1").await.unwrap();
        alice.set_session("a1").await.unwrap();

        assert!(alice.has_permanent("a1").await.unwrap());
        assert!(!bob.has_permanent("a1").await.unwrap());
        assert!(alice.has_session("a1").await.unwrap());
        assert!(!bob.has_session("a1").await.unwrap());
    }
}
