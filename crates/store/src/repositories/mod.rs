//! Typed repositories over the key-value store.

pub mod announcement;
pub mod content;
pub mod marker;

pub use announcement::AnnouncementRepository;
pub use content::{ContentCollection, ContentRepository};
pub use marker::MarkerRepository;
