//! Key-value store abstraction.
//!
//! The original console persisted everything into the browser's two storage
//! scopes. The engine never touches a concrete backend directly; every
//! component receives a [`StoreScopes`] pair and reads/writes through the
//! [`KeyValueStore`] trait, so tests can substitute an in-memory fake.

use std::sync::Arc;

use beacon_common::AppResult;

/// A shared handle to a store backend.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// String-keyed, string-valued store.
///
/// Values are JSON documents or bare scalars, exactly as the original
/// console wrote them. The store is shared, unsynchronized global state:
/// any component holding the handle may mutate any key.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Remove `key` if present.
    async fn remove(&self, key: &str) -> AppResult<()>;
}

/// The two storage scopes the engine writes into.
#[derive(Clone)]
pub struct StoreScopes {
    /// Long-lived scope: survives restarts (registry, permanent and daily
    /// markers).
    pub persistent: SharedStore,
    /// Session-lived scope: cleared when the browsing session ends
    /// (session markers).
    pub session: SharedStore,
}

impl StoreScopes {
    /// Create a scope pair from two backends.
    #[must_use]
    pub fn new(persistent: SharedStore, session: SharedStore) -> Self {
        Self {
            persistent,
            session,
        }
    }

    /// Create a fully in-memory scope pair, for tests and embedded use.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            persistent: Arc::new(crate::MemoryStore::new()),
            session: Arc::new(crate::MemoryStore::new()),
        }
    }
}
