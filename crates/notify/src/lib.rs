//! Sanchay Notify - notifications and feedback
//!
//! Owns the `notifications/` and `feedbacks/` subtrees. Notification
//! delivery is best-effort behind the [`Notifier`] trait so the approval
//! engine never couples a balance commit to a notification write.

pub mod fanout;
pub mod feedback;
pub mod notification;

pub use fanout::{Notifier, NullNotifier, StoreNotifier};
pub use feedback::{Feedback, FeedbackBox, FeedbackError};
pub use notification::{Notification, NotificationLog, Target};
