//! Widget service: the visitor-facing face of the display engine.

use beacon_common::{AppError, AppResult};
use beacon_store::entities::Announcement;
use beacon_store::repositories::{AnnouncementRepository, MarkerRepository};
use chrono::Utc;

use super::display::{DisplayController, Navigation, PopupState};
use super::session::PopupSession;
use super::trigger::Trigger;

/// Serves popup state to visitor widgets.
///
/// Each operation scopes the markers to one visitor and one browsing
/// session, then drives the display controller. The registry is only ever
/// read here; the engine never mutates it.
#[derive(Clone)]
pub struct WidgetService {
    registry: AnnouncementRepository,
    markers: MarkerRepository,
}

impl WidgetService {
    /// Create a widget service over the registry and the marker base.
    #[must_use]
    pub const fn new(registry: AnnouncementRepository, markers: MarkerRepository) -> Self {
        Self { registry, markers }
    }

    /// The popup to offer this visitor now, with its trigger, or `None`
    /// when no active announcement exists or frequency caps block it.
    pub async fn popup_for(
        &self,
        visitor_id: &str,
        session_id: &str,
    ) -> AppResult<Option<(Announcement, Trigger)>> {
        let markers = self.markers.scoped(visitor_id, session_id);
        let Some(announcement) = self.registry.find_active().await else {
            return Ok(None);
        };

        let mut controller = DisplayController::new(announcement, markers);
        if controller.arm().await? {
            let trigger = Trigger::for_announcement(controller.announcement());
            Ok(Some((controller.announcement().clone(), trigger)))
        } else {
            Ok(None)
        }
    }

    /// Record that the widget revealed announcement `id` (trigger fired
    /// client-side). Writes the daily marker when applicable.
    pub async fn record_shown(
        &self,
        id: &str,
        visitor_id: &str,
        session_id: &str,
    ) -> AppResult<()> {
        let mut controller = self.resume(id, visitor_id, session_id, PopupState::Armed).await?;
        controller.reveal_at(Utc::now()).await
    }

    /// Record an ordinary dismissal of announcement `id`.
    pub async fn record_dismissed(
        &self,
        id: &str,
        visitor_id: &str,
        session_id: &str,
    ) -> AppResult<()> {
        let mut controller = self
            .resume(id, visitor_id, session_id, PopupState::Visible)
            .await?;
        controller.dismiss().await
    }

    /// Accept the call-to-action of announcement `id`; returns where the
    /// widget should send the visitor.
    pub async fn accept_cta(
        &self,
        id: &str,
        visitor_id: &str,
        session_id: &str,
    ) -> AppResult<Navigation> {
        let mut controller = self
            .resume(id, visitor_id, session_id, PopupState::Visible)
            .await?;
        controller.accept_cta().await
    }

    /// Record an explicit "don't show again" for announcement `id`.
    pub async fn suppress(
        &self,
        id: &str,
        visitor_id: &str,
        session_id: &str,
    ) -> AppResult<()> {
        let mut controller = self
            .resume(id, visitor_id, session_id, PopupState::Visible)
            .await?;
        controller.suppress_forever().await
    }

    /// Begin a server-driven popup session (widget socket) for one visitor
    /// page view.
    pub async fn begin_session(
        &self,
        visitor_id: &str,
        session_id: &str,
    ) -> AppResult<Option<PopupSession>> {
        let markers = self.markers.scoped(visitor_id, session_id);
        PopupSession::begin(&self.registry, markers).await
    }

    /// Resume the display state machine for one reported transition.
    async fn resume(
        &self,
        id: &str,
        visitor_id: &str,
        session_id: &str,
        state: PopupState,
    ) -> AppResult<DisplayController> {
        let announcement = self
            .registry
            .load()
            .await?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::AnnouncementNotFound(id.to_string()))?;

        let markers = self.markers.scoped(visitor_id, session_id);
        Ok(DisplayController::resume(announcement, markers, state))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use beacon_store::StoreScopes;
    use beacon_store::entities::{AnnouncementKind, Frequency, TriggerKind};
    use std::time::Duration;

    use super::*;

    fn announcement(id: &str, frequency: Frequency, is_active: bool) -> Announcement {
        Announcement {
            id: id.to_string(),
            title: "Title".to_string(),
            message: "Message".to_string(),
            image: None,
            cta_text: Some("Go".to_string()),
            cta_link: Some("/training".to_string()),
            is_active,
            kind: AnnouncementKind::Event,
            trigger_type: TriggerKind::Timer,
            trigger_value: 0,
            frequency,
        }
    }

    async fn service_with(announcements: &[Announcement]) -> (WidgetService, StoreScopes) {
        let scopes = StoreScopes::in_memory();
        let registry = AnnouncementRepository::new(scopes.persistent.clone());
        registry.save(announcements).await.unwrap();
        let markers = MarkerRepository::new(scopes.clone());
        (WidgetService::new(registry, markers), scopes)
    }

    #[tokio::test]
    async fn test_popup_for_resolves_trigger_defaults() {
        let (service, _) =
            service_with(&[announcement("a1", Frequency::Session, true)]).await;

        let (popup, trigger) = service.popup_for("v1", "s1").await.unwrap().unwrap();
        assert_eq!(popup.id, "a1");
        assert_eq!(
            trigger,
            Trigger::Timer {
                delay: Duration::from_secs(3)
            }
        );
    }

    #[tokio::test]
    async fn test_popup_for_none_without_active() {
        let (service, _) =
            service_with(&[announcement("a1", Frequency::Session, false)]).await;
        assert!(service.popup_for("v1", "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dismissal_blocks_same_visitor_not_others() {
        let (service, _) =
            service_with(&[announcement("a1", Frequency::Session, true)]).await;

        service.record_dismissed("a1", "v1", "s1").await.unwrap();

        assert!(service.popup_for("v1", "s1").await.unwrap().is_none());
        assert!(service.popup_for("v2", "s2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_accept_cta_navigates_and_dismisses() {
        let (service, _) =
            service_with(&[announcement("a1", Frequency::Session, true)]).await;

        let navigation = service.accept_cta("a1", "v1", "s1").await.unwrap();
        assert_eq!(navigation, Navigation::InApp("/training".to_string()));
        assert!(service.popup_for("v1", "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_suppress_writes_permanent_marker() {
        let (service, scopes) =
            service_with(&[announcement("a1", Frequency::Session, true)]).await;

        service.suppress("a1", "v1", "s1").await.unwrap();

        let markers = MarkerRepository::new(scopes).scoped("v1", "s1");
        assert!(markers.has_permanent("a1").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_shown_touches_daily_marker() {
        let (service, scopes) =
            service_with(&[announcement("a1", Frequency::Daily, true)]).await;

        service.record_shown("a1", "v1", "s1").await.unwrap();

        let markers = MarkerRepository::new(scopes).scoped("v1", "s1");
        assert!(markers.daily_shown_at("a1").await.unwrap().is_some());
        // Daily impression consumed for this visitor.
        assert!(service.popup_for("v1", "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_announcement_is_not_found() {
        let (service, _) = service_with(&[]).await;
        let err = service.record_dismissed("ghost", "v1", "s1").await.unwrap_err();
        assert!(matches!(err, AppError::AnnouncementNotFound(_)));
    }
}
