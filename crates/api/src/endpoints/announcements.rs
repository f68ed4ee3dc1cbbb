//! Announcement registry endpoints (admin surface).

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use beacon_common::AppResult;
use beacon_core::{AnnouncementUpdate, NewAnnouncement};
use beacon_store::entities::{Announcement, AnnouncementKind, Frequency, TriggerKind};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{extractors::AdminUser, middleware::AppState, response::ApiResponse};

/// Create announcement router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_announcements))
        .route("/", post(create_announcement))
        .route("/{id}", get(get_announcement))
        .route("/{id}", put(update_announcement))
        .route("/{id}", delete(delete_announcement))
        .route("/{id}/activate", post(activate_announcement))
        .route("/{id}/toggle", post(toggle_announcement))
}

/// List announcements response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementListResponse {
    pub announcements: Vec<Announcement>,
    pub total: u64,
}

/// List all announcements, newest first.
async fn list_announcements(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<AnnouncementListResponse>> {
    let announcements = state.registry_service.list().await?;
    let total = announcements.len() as u64;

    Ok(ApiResponse::ok(AnnouncementListResponse {
        announcements,
        total,
    }))
}

/// Get a single announcement.
async fn get_announcement(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Announcement>> {
    let announcement = state
        .registry_service
        .get_by_id(&id)
        .await?
        .ok_or_else(|| beacon_common::AppError::AnnouncementNotFound(id))?;

    Ok(ApiResponse::ok(announcement))
}

/// Create announcement request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    pub image: Option<String>,
    #[validate(length(max = 100))]
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: AnnouncementKind,
    #[serde(default)]
    pub trigger_type: TriggerKind,
    #[serde(default)]
    pub trigger_value: u32,
    #[serde(default)]
    pub frequency: Frequency,
}

/// Create an announcement. New records start inactive; going live is a
/// separate activate step.
async fn create_announcement(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(req): Json<CreateAnnouncementRequest>,
) -> AppResult<ApiResponse<Announcement>> {
    req.validate()?;

    info!(title = %req.title, "Creating announcement");

    let announcement = state
        .registry_service
        .create(NewAnnouncement {
            title: req.title,
            message: req.message,
            image: req.image,
            cta_text: req.cta_text,
            cta_link: req.cta_link,
            kind: req.kind,
            trigger_type: req.trigger_type,
            trigger_value: req.trigger_value,
            frequency: req.frequency,
        })
        .await?;

    Ok(ApiResponse::ok(announcement))
}

/// Update announcement request.
///
/// Double options distinguish "leave unchanged" from "clear". Activation is
/// deliberately absent; it only moves through the activate/toggle routes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cta_text: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cta_link: Option<Option<String>>,
    #[serde(rename = "type")]
    pub kind: Option<AnnouncementKind>,
    pub trigger_type: Option<TriggerKind>,
    pub trigger_value: Option<u32>,
    pub frequency: Option<Frequency>,
}

/// Deserialize a double option so an explicitly `null` field becomes
/// `Some(None)` while an absent field stays `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Update an announcement's content and display settings.
async fn update_announcement(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAnnouncementRequest>,
) -> AppResult<ApiResponse<Announcement>> {
    info!(announcement_id = %id, "Updating announcement");

    let announcement = state
        .registry_service
        .update(
            &id,
            AnnouncementUpdate {
                title: req.title,
                message: req.message,
                image: req.image,
                cta_text: req.cta_text,
                cta_link: req.cta_link,
                kind: req.kind,
                trigger_type: req.trigger_type,
                trigger_value: req.trigger_value,
                frequency: req.frequency,
            },
        )
        .await?;

    Ok(ApiResponse::ok(announcement))
}

/// Delete an announcement.
async fn delete_announcement(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    info!(announcement_id = %id, "Deleting announcement");

    state.registry_service.delete(&id).await?;

    Ok(ApiResponse::ok(()))
}

/// Make this announcement the live one, deactivating all others.
async fn activate_announcement(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Announcement>> {
    info!(announcement_id = %id, "Activating announcement");

    let announcement = state.registry_service.set_active(&id).await?;

    Ok(ApiResponse::ok(announcement))
}

/// Flip this announcement's active state. Turning one on turns every other
/// record off.
async fn toggle_announcement(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Announcement>> {
    info!(announcement_id = %id, "Toggling announcement");

    let announcement = state.registry_service.toggle_active(&id).await?;

    Ok(ApiResponse::ok(announcement))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_wire_field_names() {
        let req: CreateAnnouncementRequest = serde_json::from_str(
            r#"{
                "title": "Summer sale",
                "message": "20% off",
                "type": "promotion",
                "triggerType": "scroll",
                "triggerValue": 60,
                "frequency": "daily"
            }"#,
        )
        .unwrap();

        assert_eq!(req.kind, AnnouncementKind::Promotion);
        assert_eq!(req.trigger_type, TriggerKind::Scroll);
        assert_eq!(req.trigger_value, 60);
        assert_eq!(req.frequency, Frequency::Daily);
    }

    #[test]
    fn create_request_rejects_empty_title() {
        let req: CreateAnnouncementRequest =
            serde_json::from_str(r#"{"title": "", "message": "hello"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_request_distinguishes_absent_from_null() {
        let req: UpdateAnnouncementRequest =
            serde_json::from_str(r#"{"title": "New", "image": null}"#).unwrap();
        assert_eq!(req.title.as_deref(), Some("New"));
        assert_eq!(req.image, Some(None));
        assert_eq!(req.cta_link, None);
    }
}
