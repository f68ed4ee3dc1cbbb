//! Persisted entities.

pub mod announcement;

pub use announcement::{Announcement, AnnouncementKind, Frequency, TriggerKind};
