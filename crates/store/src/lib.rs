//! Persisted content store for beacon.
//!
//! This crate is the storage layer of the display engine:
//!
//! - **Key-value abstraction**: [`KeyValueStore`] with a long-lived and a
//!   session-lived scope, mirroring the browser storage pair the original
//!   console persisted into
//! - **Backends**: [`MemoryStore`] (session scope, tests) and
//!   [`JsonFileStore`] (long-lived scope)
//! - **Entities**: the [`Announcement`](entities::Announcement) record
//! - **Repositories**: typed read/write contracts per logical key

pub mod entities;
pub mod file;
pub mod keys;
pub mod kv;
pub mod memory;
pub mod repositories;

pub use file::JsonFileStore;
pub use kv::{KeyValueStore, SharedStore, StoreScopes};
pub use memory::MemoryStore;
