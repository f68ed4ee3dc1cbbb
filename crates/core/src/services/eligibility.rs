//! Eligibility evaluator.

use beacon_common::AppResult;
use beacon_store::entities::{Announcement, Frequency};
use beacon_store::repositories::MarkerRepository;
use chrono::{DateTime, Duration, Utc};

/// Decides whether frequency-capping rules permit showing an announcement
/// this visit. Pure with respect to the visitor's store: reads only.
#[derive(Clone)]
pub struct EligibilityEvaluator {
    markers: MarkerRepository,
}

impl EligibilityEvaluator {
    /// The re-display window for `daily` announcements.
    pub const DAILY_WINDOW: Duration = Duration::hours(24);

    /// Create an evaluator over the given markers.
    #[must_use]
    pub const fn new(markers: MarkerRepository) -> Self {
        Self { markers }
    }

    /// Whether the announcement may be shown now.
    pub async fn is_eligible(&self, announcement: &Announcement) -> AppResult<bool> {
        self.is_eligible_at(announcement, Utc::now()).await
    }

    /// Whether the announcement may be shown at `now`.
    ///
    /// Exactly one marker kind is consulted, selected by the announcement's
    /// current frequency; changing the frequency of an already-dismissed
    /// announcement therefore resets eligibility under the new rule. Marker
    /// read failures follow the repository's fail-open policy.
    pub async fn is_eligible_at(
        &self,
        announcement: &Announcement,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        match announcement.frequency {
            Frequency::Once => Ok(!self.markers.has_permanent(&announcement.id).await?),
            Frequency::Daily => {
                match self.markers.daily_shown_at(&announcement.id).await? {
                    Some(shown_at) => Ok(now - shown_at >= Self::DAILY_WINDOW),
                    None => Ok(true),
                }
            }
            Frequency::Session => Ok(!self.markers.has_session(&announcement.id).await?),
        }
    }
}
