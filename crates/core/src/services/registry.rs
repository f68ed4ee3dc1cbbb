//! Announcement registry service.

use std::sync::Arc;

use beacon_common::{AppError, AppResult, IdGenerator};
use beacon_store::entities::{Announcement, AnnouncementKind, Frequency, TriggerKind};
use beacon_store::repositories::AnnouncementRepository;
use tokio::sync::Mutex;
use tracing::info;

/// Fields for a new announcement.
#[derive(Clone, Debug)]
pub struct NewAnnouncement {
    pub title: String,
    pub message: String,
    pub image: Option<String>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub kind: AnnouncementKind,
    pub trigger_type: TriggerKind,
    pub trigger_value: u32,
    pub frequency: Frequency,
}

/// Partial update of an announcement.
///
/// `Option<Option<T>>` distinguishes "leave unchanged" from "clear".
/// Activation is not part of an update; it only moves through
/// [`RegistryService::set_active`] and [`RegistryService::toggle_active`],
/// which also clear every other record.
#[derive(Clone, Debug, Default)]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub message: Option<String>,
    pub image: Option<Option<String>>,
    pub cta_text: Option<Option<String>>,
    pub cta_link: Option<Option<String>>,
    pub kind: Option<AnnouncementKind>,
    pub trigger_type: Option<TriggerKind>,
    pub trigger_value: Option<u32>,
    pub frequency: Option<Frequency>,
}

/// Service for managing the announcement registry.
///
/// All mutations are read-modify-write of the whole list under one lock and
/// land as a single registry write, so a reader never observes two records
/// simultaneously active.
#[derive(Clone)]
pub struct RegistryService {
    announcement_repo: AnnouncementRepository,
    id_gen: IdGenerator,
    write_lock: Arc<Mutex<()>>,
}

impl RegistryService {
    /// Create a new registry service.
    #[must_use]
    pub fn new(announcement_repo: AnnouncementRepository) -> Self {
        Self {
            announcement_repo,
            id_gen: IdGenerator::new(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// List all announcements, newest first.
    pub async fn list(&self) -> AppResult<Vec<Announcement>> {
        self.announcement_repo.load().await
    }

    /// Get an announcement by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Announcement>> {
        Ok(self
            .announcement_repo
            .load()
            .await?
            .into_iter()
            .find(|a| a.id == id))
    }

    /// The currently live announcement, if any (first active in list order).
    pub async fn active(&self) -> Option<Announcement> {
        self.announcement_repo.find_active().await
    }

    /// Create a new announcement, inactive, prepended to the registry.
    pub async fn create(&self, new: NewAnnouncement) -> AppResult<Announcement> {
        let _guard = self.write_lock.lock().await;

        let announcement = Announcement {
            id: self.id_gen.generate(),
            title: new.title,
            message: new.message,
            image: new.image,
            cta_text: new.cta_text,
            cta_link: new.cta_link,
            is_active: false,
            kind: new.kind,
            trigger_type: new.trigger_type,
            trigger_value: new.trigger_value,
            frequency: new.frequency,
        };

        let mut announcements = self.announcement_repo.load().await?;
        announcements.insert(0, announcement.clone());
        self.announcement_repo.save(&announcements).await?;

        info!(announcement_id = %announcement.id, "Created announcement");
        Ok(announcement)
    }

    /// Update an announcement's fields.
    pub async fn update(&self, id: &str, update: AnnouncementUpdate) -> AppResult<Announcement> {
        let _guard = self.write_lock.lock().await;

        let mut announcements = self.announcement_repo.load().await?;
        let slot = announcements
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::AnnouncementNotFound(id.to_string()))?;

        if let Some(title) = update.title {
            slot.title = title;
        }
        if let Some(message) = update.message {
            slot.message = message;
        }
        if let Some(image) = update.image {
            slot.image = image;
        }
        if let Some(cta_text) = update.cta_text {
            slot.cta_text = cta_text;
        }
        if let Some(cta_link) = update.cta_link {
            slot.cta_link = cta_link;
        }
        if let Some(kind) = update.kind {
            slot.kind = kind;
        }
        if let Some(trigger_type) = update.trigger_type {
            slot.trigger_type = trigger_type;
        }
        if let Some(trigger_value) = update.trigger_value {
            slot.trigger_value = trigger_value;
        }
        if let Some(frequency) = update.frequency {
            slot.frequency = frequency;
        }

        let updated = slot.clone();
        self.announcement_repo.save(&announcements).await?;

        info!(announcement_id = %id, "Updated announcement");
        Ok(updated)
    }

    /// Delete an announcement.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut announcements = self.announcement_repo.load().await?;
        let before = announcements.len();
        announcements.retain(|a| a.id != id);

        if announcements.len() == before {
            return Err(AppError::AnnouncementNotFound(id.to_string()));
        }

        self.announcement_repo.save(&announcements).await?;

        info!(announcement_id = %id, "Deleted announcement");
        Ok(())
    }

    /// Make `id` the single active record, deactivating every other one.
    pub async fn set_active(&self, id: &str) -> AppResult<Announcement> {
        let _guard = self.write_lock.lock().await;
        self.activate_locked(id).await
    }

    /// Toggle activation: deactivate `id` if it is live (leaving zero active
    /// records), otherwise activate it and deactivate all others.
    pub async fn toggle_active(&self, id: &str) -> AppResult<Announcement> {
        let _guard = self.write_lock.lock().await;

        let announcements = self.announcement_repo.load().await?;
        let target = announcements
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::AnnouncementNotFound(id.to_string()))?;

        if target.is_active {
            let mut announcements = announcements;
            for a in &mut announcements {
                a.is_active = false;
            }
            let updated = announcements
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| AppError::AnnouncementNotFound(id.to_string()))?;
            self.announcement_repo.save(&announcements).await?;

            info!(announcement_id = %id, "Deactivated announcement");
            Ok(updated)
        } else {
            self.activate_locked(id).await
        }
    }

    /// Activation body shared by `set_active` and `toggle_active`.
    /// Caller holds the write lock.
    async fn activate_locked(&self, id: &str) -> AppResult<Announcement> {
        let mut announcements = self.announcement_repo.load().await?;

        if !announcements.iter().any(|a| a.id == id) {
            return Err(AppError::AnnouncementNotFound(id.to_string()));
        }

        for a in &mut announcements {
            a.is_active = a.id == id;
        }

        let updated = announcements
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| AppError::AnnouncementNotFound(id.to_string()))?;
        self.announcement_repo.save(&announcements).await?;

        info!(announcement_id = %id, "Activated announcement");
        Ok(updated)
    }
}
