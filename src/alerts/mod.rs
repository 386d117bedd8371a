/// Threshold evaluation producing alert conditions
pub mod conditions;

/// Session-lifetime deduplication of alert conditions
pub mod dedup;

/// Notification center consumed by badges and list views
pub mod notifications;

pub use conditions::{evaluate, AlertCondition, AlertKind};
pub use dedup::SeenSet;
pub use notifications::{Notification, NotificationCenter};
