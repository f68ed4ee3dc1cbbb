//! Trigger detector.
//!
//! One watcher is armed per page view, for the single eligible active
//! announcement. The watcher consumes a stream of viewport events (or a
//! timer) and resolves at most once; it never arbitrates between competing
//! triggers because the registry invariant excludes simultaneous live
//! announcements.

use std::time::Duration;

use beacon_store::entities::{Announcement, TriggerKind};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Default timer delay when `triggerValue` is unset or zero.
pub const DEFAULT_TIMER_SECS: u32 = 3;

/// Default scroll depth (percent) when `triggerValue` is unset or zero.
pub const DEFAULT_SCROLL_PERCENT: u32 = 50;

/// Pointer height (device-independent pixels from the top edge) under which
/// an upward move counts as exit intent.
pub const EXIT_TOP_THRESHOLD_PX: f64 = 15.0;

/// Trigger strategy derived from an announcement, with defaults applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Trigger {
    /// Fire after a one-shot delay.
    Timer {
        /// Delay before firing.
        delay: Duration,
    },
    /// Fire the first time the page is scrolled past a depth.
    Scroll {
        /// Depth in percent of the scrollable range.
        threshold_percent: f64,
    },
    /// Fire the first time the pointer crosses the near-top threshold.
    Exit,
}

impl Trigger {
    /// The trigger configured on `announcement`.
    #[must_use]
    pub fn for_announcement(announcement: &Announcement) -> Self {
        match announcement.trigger_type {
            TriggerKind::Timer => {
                let secs = if announcement.trigger_value == 0 {
                    DEFAULT_TIMER_SECS
                } else {
                    announcement.trigger_value
                };
                Self::Timer {
                    delay: Duration::from_secs(u64::from(secs)),
                }
            }
            TriggerKind::Scroll => {
                let percent = if announcement.trigger_value == 0 {
                    DEFAULT_SCROLL_PERCENT
                } else {
                    announcement.trigger_value
                };
                Self::Scroll {
                    threshold_percent: f64::from(percent),
                }
            }
            TriggerKind::Exit => Self::Exit,
        }
    }

    /// The configured value with defaults resolved (seconds for timer,
    /// percent for scroll, zero for exit), for reporting to widget clients.
    #[must_use]
    pub fn resolved_value(&self) -> u32 {
        match self {
            Self::Timer { delay } => u32::try_from(delay.as_secs()).unwrap_or(u32::MAX),
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Self::Scroll { threshold_percent } => *threshold_percent as u32,
            Self::Exit => 0,
        }
    }
}

/// Visitor behavior observed by the watcher.
///
/// Serialized form is the widget wire format (camelCase tagged objects).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewportEvent {
    /// Vertical scroll position changed.
    #[serde(rename_all = "camelCase")]
    Scroll {
        /// Current vertical scroll offset.
        offset: f64,
        /// Full document height.
        document_height: f64,
        /// Viewport height.
        viewport_height: f64,
    },
    /// Pointer moved.
    #[serde(rename_all = "camelCase")]
    PointerMove {
        /// Pointer vertical position, from the top edge.
        y: f64,
    },
}

/// A one-shot watcher for a single trigger.
///
/// [`TriggerWatcher::fired`] consumes the watcher, which is the at-most-once
/// guarantee; dropping it (or the future) detaches the observation, so
/// page teardown leaks nothing.
#[derive(Debug)]
pub struct TriggerWatcher {
    trigger: Trigger,
    events: mpsc::Receiver<ViewportEvent>,
}

impl TriggerWatcher {
    /// Arm a watcher for `trigger` over the given event source.
    #[must_use]
    pub fn arm(trigger: Trigger, events: mpsc::Receiver<ViewportEvent>) -> Self {
        Self { trigger, events }
    }

    /// The trigger this watcher is armed for.
    #[must_use]
    pub const fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Wait for the trigger.
    ///
    /// Resolves `true` when the configured visitor behavior occurs, `false`
    /// when the event source closes first (the page view ended unfired).
    pub async fn fired(mut self) -> bool {
        match self.trigger {
            Trigger::Timer { delay } => {
                tokio::time::sleep(delay).await;
                debug!(?delay, "Timer trigger fired");
                true
            }
            Trigger::Scroll { threshold_percent } => {
                while let Some(event) = self.events.recv().await {
                    if let ViewportEvent::Scroll {
                        offset,
                        document_height,
                        viewport_height,
                    } = event
                    {
                        let scrollable = document_height - viewport_height;
                        if scrollable <= 0.0 {
                            // Content fits the viewport: never fire.
                            continue;
                        }
                        let percent = offset / scrollable * 100.0;
                        if percent >= threshold_percent {
                            debug!(percent, threshold_percent, "Scroll trigger fired");
                            return true;
                        }
                    }
                }
                false
            }
            Trigger::Exit => {
                while let Some(event) = self.events.recv().await {
                    if let ViewportEvent::PointerMove { y } = event
                        && y < EXIT_TOP_THRESHOLD_PX
                    {
                        debug!(y, "Exit-intent trigger fired");
                        return true;
                    }
                }
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use beacon_store::entities::{AnnouncementKind, Frequency};

    use super::*;

    fn announcement(trigger_type: TriggerKind, trigger_value: u32) -> Announcement {
        Announcement {
            id: "a1".to_string(),
            title: "Title".to_string(),
            message: "Message".to_string(),
            image: None,
            cta_text: None,
            cta_link: None,
            is_active: true,
            kind: AnnouncementKind::Info,
            trigger_type,
            trigger_value,
            frequency: Frequency::Session,
        }
    }

    fn scroll(offset: f64) -> ViewportEvent {
        // A page exactly twice the viewport height: scrollable range 800.
        ViewportEvent::Scroll {
            offset,
            document_height: 1600.0,
            viewport_height: 800.0,
        }
    }

    #[test]
    fn test_defaults_applied_for_zero_values() {
        assert_eq!(
            Trigger::for_announcement(&announcement(TriggerKind::Timer, 0)),
            Trigger::Timer {
                delay: Duration::from_secs(3)
            }
        );
        assert_eq!(
            Trigger::for_announcement(&announcement(TriggerKind::Scroll, 0)),
            Trigger::Scroll {
                threshold_percent: 50.0
            }
        );
        assert_eq!(
            Trigger::for_announcement(&announcement(TriggerKind::Exit, 99)),
            Trigger::Exit
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_configured_delay() {
        let (_tx, rx) = mpsc::channel(8);
        let trigger = Trigger::for_announcement(&announcement(TriggerKind::Timer, 3));
        let watcher = TriggerWatcher::arm(trigger, rx);

        let fired = tokio::spawn(watcher.fired());

        tokio::time::advance(Duration::from_millis(2_999)).await;
        assert!(!fired.is_finished());

        assert!(fired.await.unwrap());
    }

    #[tokio::test]
    async fn test_scroll_fires_first_at_midpoint() {
        let (tx, rx) = mpsc::channel(8);
        let trigger = Trigger::for_announcement(&announcement(TriggerKind::Scroll, 50));
        let watcher = TriggerWatcher::arm(trigger, rx);

        // Everything short of the midpoint, then the midpoint itself.
        for offset in [0.0, 100.0, 399.0] {
            tx.send(scroll(offset)).await.unwrap();
        }
        tx.send(scroll(400.0)).await.unwrap();
        drop(tx);

        assert!(watcher.fired().await);
    }

    #[tokio::test]
    async fn test_scroll_never_fires_below_threshold() {
        let (tx, rx) = mpsc::channel(8);
        let trigger = Trigger::for_announcement(&announcement(TriggerKind::Scroll, 50));
        let watcher = TriggerWatcher::arm(trigger, rx);

        for offset in [0.0, 200.0, 399.9] {
            tx.send(scroll(offset)).await.unwrap();
        }
        drop(tx);

        assert!(!watcher.fired().await);
    }

    #[tokio::test]
    async fn test_scroll_never_fires_when_content_fits_viewport() {
        let (tx, rx) = mpsc::channel(8);
        let watcher = TriggerWatcher::arm(
            Trigger::Scroll {
                threshold_percent: 50.0,
            },
            rx,
        );

        // Zero and negative scrollable range.
        for (doc, viewport) in [(800.0, 800.0), (600.0, 800.0)] {
            tx.send(ViewportEvent::Scroll {
                offset: 10_000.0,
                document_height: doc,
                viewport_height: viewport,
            })
            .await
            .unwrap();
        }
        drop(tx);

        assert!(!watcher.fired().await);
    }

    #[tokio::test]
    async fn test_exit_fires_on_near_top_pointer() {
        let (tx, rx) = mpsc::channel(8);
        let watcher = TriggerWatcher::arm(Trigger::Exit, rx);

        tx.send(ViewportEvent::PointerMove { y: 400.0 }).await.unwrap();
        tx.send(ViewportEvent::PointerMove { y: 15.0 }).await.unwrap();
        tx.send(ViewportEvent::PointerMove { y: 14.9 }).await.unwrap();
        drop(tx);

        assert!(watcher.fired().await);
    }

    #[tokio::test]
    async fn test_exit_ignores_scroll_events() {
        let (tx, rx) = mpsc::channel(8);
        let watcher = TriggerWatcher::arm(Trigger::Exit, rx);

        tx.send(scroll(800.0)).await.unwrap();
        drop(tx);

        assert!(!watcher.fired().await);
    }

    #[test]
    fn test_viewport_event_wire_format() {
        let event: ViewportEvent =
            serde_json::from_str(r#"{"type":"pointerMove","y":3.5}"#).unwrap();
        assert_eq!(event, ViewportEvent::PointerMove { y: 3.5 });

        let event: ViewportEvent = serde_json::from_str(
            r#"{"type":"scroll","offset":10,"documentHeight":1600,"viewportHeight":800}"#,
        )
        .unwrap();
        assert!(matches!(event, ViewportEvent::Scroll { .. }));
    }
}
