//! Boundary with out-of-process surfaces: the status projection they read,
//! the notifications they render and the command mailbox they write to.

pub mod command;
mod notification;
pub mod projection;

pub use command::Command;
pub use notification::{
    NotificationPayload, Notifier, NullNotifier, PreferenceNotifier, ALERT_NOTIFICATION_ID,
    NOTIFICATION_KEY, STICKY_NOTIFICATION_ID,
};
pub use projection::{HomeSummary, SessionProjection, END_OF_SESSION};
