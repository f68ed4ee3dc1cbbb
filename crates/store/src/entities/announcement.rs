//! Announcement entity.

use serde::{Deserialize, Serialize};

/// One promotional record in the registry.
///
/// Field names serialize to the camelCase JSON layout the original console
/// stored under the registry key; existing registries load unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    /// Unique announcement ID, assigned at creation time.
    pub id: String,

    /// Headline shown in the popup.
    pub title: String,

    /// Body text shown in the popup.
    pub message: String,

    /// Image URL or embedded-image reference (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Label for the call-to-action button (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_text: Option<String>,

    /// Destination of the call-to-action: absolute external URL or internal
    /// site path (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_link: Option<String>,

    /// Whether this record is the live popup. At most one record in the
    /// registry may be active at a time.
    pub is_active: bool,

    /// Cosmetic category, no behavioral effect.
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,

    /// Which visitor behavior reveals the popup.
    pub trigger_type: TriggerKind,

    /// Trigger parameter: seconds of delay for `timer`, percent of page
    /// scrolled for `scroll`; unused for `exit`. Zero means "use default".
    #[serde(default)]
    pub trigger_value: u32,

    /// How often a visitor may be shown this announcement.
    pub frequency: Frequency,
}

/// Cosmetic announcement category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    /// General information.
    #[default]
    Info,
    /// Promotional content.
    Promotion,
    /// Event announcement.
    Event,
}

/// Visitor behavior that reveals an eligible announcement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Reveal after a fixed delay.
    #[default]
    Timer,
    /// Reveal at a scroll depth.
    Scroll,
    /// Reveal on exit intent (pointer heading for the browser chrome).
    Exit,
}

/// Frequency-capping mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Show at most once ever.
    Once,
    /// Show at most once per browsing session.
    #[default]
    Session,
    /// Show at most once per 24 hours.
    Daily,
}
