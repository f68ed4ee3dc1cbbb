//! Logical key layout of the persisted store.
//!
//! The `ds_`-prefixed names are the wire format the original console wrote
//! into browser storage and are preserved verbatim. Marker keys are
//! additionally namespaced per visitor when the engine serves many visitors
//! from one process; an empty namespace reproduces the original
//! single-browser layout.

/// Announcement registry: ordered JSON list of announcements (long-lived).
pub const ANNOUNCEMENTS: &str = "ds_announcements";

/// News posts collection (long-lived).
pub const NEWS: &str = "ds_news";

/// Job listings collection (long-lived).
pub const JOBS: &str = "ds_jobs";

/// Training images collection (long-lived).
pub const TRAINING_IMAGES: &str = "ds_training_images";

/// Gallery images collection (long-lived).
pub const GALLERY: &str = "ds_gallery";

/// Permanent "don't show again" marker for one announcement (long-lived).
#[must_use]
pub fn permanent_marker(namespace: &str, announcement_id: &str) -> String {
    format!("{namespace}ds_announcement_permanent_{announcement_id}")
}

/// Last-shown timestamp marker for one announcement (long-lived).
#[must_use]
pub fn daily_marker(namespace: &str, announcement_id: &str) -> String {
    format!("{namespace}ds_announcement_daily_{announcement_id}")
}

/// Ordinary-dismissal marker for one announcement (session-lived).
#[must_use]
pub fn session_marker(namespace: &str, announcement_id: &str) -> String {
    format!("{namespace}ds_announcement_dismissed_{announcement_id}")
}

/// Namespace prefix for one visitor's long-lived marker keys.
#[must_use]
pub fn visitor_namespace(visitor_id: &str) -> String {
    format!("visitor:{visitor_id}:")
}

/// Namespace prefix for one browsing session's marker keys.
#[must_use]
pub fn session_namespace(session_id: &str) -> String {
    format!("session:{session_id}:")
}
