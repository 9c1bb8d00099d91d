//! Ticker notification and the rest-over alert.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::projection::SessionProjection;
use crate::error::Result;
use crate::storage::PreferenceStore;
use crate::timer::TimerMode;

pub const STICKY_NOTIFICATION_ID: i32 = 1001;
pub const ALERT_NOTIFICATION_ID: i32 = 2002;
pub const NOTIFICATION_KEY: &str = "session_notification";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub is_paused: bool,
    pub channel_id: String,
    pub absolute_start: Option<i64>,
    pub absolute_end: Option<i64>,
    pub is_stopwatch: bool,
}

impl NotificationPayload {
    /// Ongoing status notification mirroring the projection.
    pub fn sticky(projection: &SessionProjection, channel_id: &str) -> Self {
        let is_stopwatch = projection.mode == TimerMode::Stopwatch;
        let (title, body) = if projection.paused {
            (
                format!("Paused: {}", projection.exercise),
                format!("Set {} | Paused", projection.current_set),
            )
        } else if is_stopwatch {
            (
                format!("Workout: {}", projection.exercise),
                "Stopwatch running".to_string(),
            )
        } else {
            (
                format!("Workout: {}", projection.exercise),
                format!("Set {} | Resting", projection.current_set),
            )
        };

        Self {
            id: STICKY_NOTIFICATION_ID,
            title,
            body,
            is_paused: projection.paused,
            channel_id: channel_id.to_string(),
            absolute_start: projection.timer_start,
            absolute_end: projection.timer_end,
            is_stopwatch,
        }
    }

    /// One-shot alert when a rest countdown runs out.
    pub fn rest_over(exercise: &str, channel_id: &str) -> Self {
        Self {
            id: ALERT_NOTIFICATION_ID,
            title: "Time's up!".to_string(),
            body: format!("Get ready for: {exercise}"),
            is_paused: true,
            channel_id: channel_id.to_string(),
            absolute_start: None,
            absolute_end: None,
            is_stopwatch: false,
        }
    }
}

pub trait Notifier {
    fn show(&self, payload: &NotificationPayload) -> Result<()>;
    fn cancel(&self, id: i32) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn show(&self, _payload: &NotificationPayload) -> Result<()> {
        Ok(())
    }

    fn cancel(&self, _id: i32) -> Result<()> {
        Ok(())
    }
}

/// Keeps the visible notifications, keyed by id, in the preference store
/// for an out-of-process renderer.
pub struct PreferenceNotifier {
    prefs: Rc<dyn PreferenceStore>,
}

impl PreferenceNotifier {
    pub fn new(prefs: Rc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    pub fn visible(&self) -> Result<BTreeMap<i32, NotificationPayload>> {
        match self.prefs.get(NOTIFICATION_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(BTreeMap::new()),
        }
    }

    fn store(&self, visible: &BTreeMap<i32, NotificationPayload>) -> Result<()> {
        if visible.is_empty() {
            self.prefs.remove(NOTIFICATION_KEY)
        } else {
            self.prefs
                .set(NOTIFICATION_KEY, &serde_json::to_string(visible)?)
        }
    }
}

impl Notifier for PreferenceNotifier {
    fn show(&self, payload: &NotificationPayload) -> Result<()> {
        // A corrupt entry is replaced rather than blocking new notifications.
        let mut visible = self.visible().unwrap_or_default();
        visible.insert(payload.id, payload.clone());
        self.store(&visible)
    }

    fn cancel(&self, id: i32) -> Result<()> {
        let mut visible = self.visible().unwrap_or_default();
        visible.remove(&id);
        self.store(&visible)
    }
}
