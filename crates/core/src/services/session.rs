//! Popup session: one visitor page view of the display engine.

use beacon_common::AppResult;
use beacon_store::entities::Announcement;
use beacon_store::repositories::{AnnouncementRepository, MarkerRepository};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use super::display::{DisplayController, Navigation, PopupState};
use super::trigger::{Trigger, TriggerWatcher, ViewportEvent};

/// Capacity of the viewport-event channel feeding the watcher.
const EVENT_BUFFER: usize = 64;

/// Orchestrates one page view: select the live announcement, evaluate
/// eligibility exactly once, arm the matching trigger watcher, and own the
/// display state machine until the view ends.
///
/// Dropping the session aborts the watcher, so navigating away cancels the
/// observation without leaking it.
pub struct PopupSession {
    controller: DisplayController,
    trigger: Trigger,
    events_tx: mpsc::Sender<ViewportEvent>,
    fired_rx: Option<oneshot::Receiver<bool>>,
    watcher_task: JoinHandle<()>,
}

impl PopupSession {
    /// Begin a page view.
    ///
    /// Returns `None` when there is nothing to arm: no active announcement
    /// (or an unreadable registry, which reads as none) or an active
    /// announcement the visitor is not eligible for this visit.
    pub async fn begin(
        registry: &AnnouncementRepository,
        markers: MarkerRepository,
    ) -> AppResult<Option<Self>> {
        let Some(announcement) = registry.find_active().await else {
            return Ok(None);
        };

        let mut controller = DisplayController::new(announcement, markers);
        if !controller.arm().await? {
            debug!(
                announcement_id = %controller.announcement().id,
                "Active announcement not eligible this visit"
            );
            return Ok(None);
        }

        let trigger = Trigger::for_announcement(controller.announcement());
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let watcher = TriggerWatcher::arm(trigger, events_rx);

        let (fired_tx, fired_rx) = oneshot::channel();
        let watcher_task = tokio::spawn(async move {
            let _ = fired_tx.send(watcher.fired().await);
        });

        Ok(Some(Self {
            controller,
            trigger,
            events_tx,
            fired_rx: Some(fired_rx),
            watcher_task,
        }))
    }

    /// The armed trigger.
    #[must_use]
    pub const fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// The announcement this session may display.
    #[must_use]
    pub const fn announcement(&self) -> &Announcement {
        self.controller.announcement()
    }

    /// Current display state.
    #[must_use]
    pub const fn state(&self) -> PopupState {
        self.controller.state()
    }

    /// A sender for feeding visitor viewport events to the watcher.
    #[must_use]
    pub fn events(&self) -> mpsc::Sender<ViewportEvent> {
        self.events_tx.clone()
    }

    /// Take the one-shot firing signal, for callers that multiplex it with
    /// other I/O (the widget socket). Pair with [`Self::reveal`].
    pub fn take_fired(&mut self) -> Option<oneshot::Receiver<bool>> {
        self.fired_rx.take()
    }

    /// Wait for the trigger and reveal the popup.
    ///
    /// Resolves `true` once visible, `false` when the view ended before the
    /// trigger fired (or the signal was already taken).
    pub async fn wait_for_reveal(&mut self) -> AppResult<bool> {
        let Some(fired_rx) = self.fired_rx.take() else {
            return Ok(false);
        };

        match fired_rx.await {
            Ok(true) => {
                self.controller.reveal().await?;
                Ok(true)
            }
            Ok(false) | Err(_) => Ok(false),
        }
    }

    /// Transition to visible after an externally awaited firing signal.
    pub async fn reveal(&mut self) -> AppResult<()> {
        self.controller.reveal().await
    }

    /// Ordinary dismissal.
    pub async fn dismiss(&mut self) -> AppResult<()> {
        self.controller.dismiss().await
    }

    /// Accept the call-to-action.
    pub async fn accept_cta(&mut self) -> AppResult<Navigation> {
        self.controller.accept_cta().await
    }

    /// Explicit "don't show again".
    pub async fn suppress_forever(&mut self) -> AppResult<()> {
        self.controller.suppress_forever().await
    }
}

impl Drop for PopupSession {
    fn drop(&mut self) {
        self.watcher_task.abort();
    }
}
