//! Display-engine services.

pub mod display;
pub mod eligibility;
pub mod registry;
pub mod session;
pub mod trigger;
pub mod widget;

pub use display::{DisplayController, Navigation, PopupState};
pub use eligibility::EligibilityEvaluator;
pub use registry::{AnnouncementUpdate, NewAnnouncement, RegistryService};
pub use session::PopupSession;
pub use trigger::{Trigger, TriggerWatcher, ViewportEvent};
pub use widget::WidgetService;
