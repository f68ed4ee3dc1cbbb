//! Display controller.

use beacon_common::{AppError, AppResult};
use beacon_store::entities::{Announcement, Frequency};
use beacon_store::repositories::MarkerRepository;
use chrono::{DateTime, Utc};
use tracing::info;

use super::eligibility::EligibilityEvaluator;

/// Popup visibility state for one page view.
///
/// `Unarmed -> Armed` on a successful eligibility check, `Armed -> Visible`
/// on trigger fire, `Visible -> Dismissed` on any dismiss-family operation.
/// `Dismissed` is terminal: once dismissed the popup does not re-arm within
/// the same view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupState {
    /// Eligibility not yet passed (or failed); nothing will show.
    Unarmed,
    /// Eligible; a trigger watcher is observing the visitor.
    Armed,
    /// Revealed, awaiting a user action.
    Visible,
    /// Closed; terminal for the page view.
    Dismissed,
}

/// Where accepting the call-to-action should take the visitor.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "action", content = "target", rename_all = "camelCase")]
pub enum Navigation {
    /// Absolute external URL: open in a new browsing context.
    ExternalNewTab(String),
    /// Internal site path: navigate within the application.
    InApp(String),
    /// No CTA link configured; nothing to do.
    None,
}

impl Navigation {
    /// Classify a CTA link: `http`/`https` schemes are external, everything
    /// else is an in-app path.
    #[must_use]
    pub fn for_link(link: &str) -> Self {
        match url::Url::parse(link) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                Self::ExternalNewTab(link.to_string())
            }
            Ok(_) | Err(_) => Self::InApp(link.to_string()),
        }
    }
}

/// Owns the popup's visibility state and records display outcomes back into
/// the visitor's markers.
pub struct DisplayController {
    announcement: Announcement,
    markers: MarkerRepository,
    state: PopupState,
}

impl DisplayController {
    /// Create an unarmed controller for `announcement`.
    #[must_use]
    pub const fn new(announcement: Announcement, markers: MarkerRepository) -> Self {
        Self {
            announcement,
            markers,
            state: PopupState::Unarmed,
        }
    }

    /// Resume the state machine at `state`, for stateless front ends that
    /// report transitions one request at a time.
    #[must_use]
    pub const fn resume(
        announcement: Announcement,
        markers: MarkerRepository,
        state: PopupState,
    ) -> Self {
        Self {
            announcement,
            markers,
            state,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PopupState {
        self.state
    }

    /// The announcement this controller displays.
    #[must_use]
    pub const fn announcement(&self) -> &Announcement {
        &self.announcement
    }

    /// Evaluate eligibility once and arm. Returns whether the controller
    /// armed; on an ineligible announcement it stays `Unarmed`.
    pub async fn arm(&mut self) -> AppResult<bool> {
        self.arm_at(Utc::now()).await
    }

    /// Evaluate eligibility at `now` and arm.
    pub async fn arm_at(&mut self, now: DateTime<Utc>) -> AppResult<bool> {
        if self.state != PopupState::Unarmed {
            return Err(AppError::Conflict(format!(
                "Popup already armed (state {:?})",
                self.state
            )));
        }

        let evaluator = EligibilityEvaluator::new(self.markers.clone());
        if evaluator.is_eligible_at(&self.announcement, now).await? {
            self.state = PopupState::Armed;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Transition to visible on trigger fire.
    pub async fn reveal(&mut self) -> AppResult<()> {
        self.reveal_at(Utc::now()).await
    }

    /// Transition to visible at `now`.
    ///
    /// For `daily` announcements the marker is written immediately on
    /// reveal, not on dismissal, so a visitor who reopens the tab mid-popup
    /// cannot collect a second daily impression from the race.
    pub async fn reveal_at(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.state != PopupState::Armed {
            return Err(AppError::Conflict(format!(
                "Cannot reveal from state {:?}",
                self.state
            )));
        }

        if self.announcement.frequency == Frequency::Daily {
            self.markers.touch_daily(&self.announcement.id, now).await?;
        }

        self.state = PopupState::Visible;
        info!(announcement_id = %self.announcement.id, "Popup revealed");
        Ok(())
    }

    /// Ordinary dismissal ("Close").
    pub async fn dismiss(&mut self) -> AppResult<()> {
        self.require_visible("dismiss")?;
        self.record_dismissal().await?;
        self.state = PopupState::Dismissed;
        info!(announcement_id = %self.announcement.id, "Popup dismissed");
        Ok(())
    }

    /// Accept the call-to-action: returns the navigation decision, then
    /// performs the same bookkeeping as [`Self::dismiss`].
    ///
    /// With no CTA link configured this is a no-op: the popup stays visible
    /// and [`Navigation::None`] is returned.
    pub async fn accept_cta(&mut self) -> AppResult<Navigation> {
        self.require_visible("accept CTA")?;

        let Some(link) = self.announcement.cta_link.clone() else {
            return Ok(Navigation::None);
        };

        let navigation = Navigation::for_link(&link);
        self.record_dismissal().await?;
        self.state = PopupState::Dismissed;
        info!(announcement_id = %self.announcement.id, ?navigation, "CTA accepted");
        Ok(navigation)
    }

    /// Explicit "don't show again": always writes the permanent marker and
    /// hides, overriding whatever the configured frequency would do.
    pub async fn suppress_forever(&mut self) -> AppResult<()> {
        self.require_visible("suppress")?;
        self.markers.set_permanent(&self.announcement.id).await?;
        self.state = PopupState::Dismissed;
        info!(announcement_id = %self.announcement.id, "Popup suppressed forever");
        Ok(())
    }

    fn require_visible(&self, operation: &str) -> AppResult<()> {
        if self.state == PopupState::Visible {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Cannot {operation} from state {:?}",
                self.state
            )))
        }
    }

    /// Frequency-dependent dismissal bookkeeping. The daily marker was
    /// already written at reveal time.
    async fn record_dismissal(&self) -> AppResult<()> {
        match self.announcement.frequency {
            Frequency::Session => self.markers.set_session(&self.announcement.id).await,
            Frequency::Once => self.markers.set_permanent(&self.announcement.id).await,
            Frequency::Daily => Ok(()),
        }
    }
}
