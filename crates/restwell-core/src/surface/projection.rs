//! Compact session status for widgets, and the home-screen summary.
//!
//! Surfaces cannot tick on their own, so a running timer is published as an
//! absolute timestamp (countdown end or stopwatch start) and each surface
//! derives the remaining or elapsed time from its own clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::session::SessionState;
use crate::storage::PreferenceStore;
use crate::timer::{TimerClock, TimerMode};

pub const PROJECTION_KEY: &str = "session_status";
pub const HOME_SUMMARY_KEY: &str = "home_summary";

/// Shown as the next exercise when there is none.
pub const END_OF_SESSION: &str = "End of workout";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProjection {
    pub exercise: String,
    pub next: String,
    /// 1-based.
    pub current_set: usize,
    pub total_sets: usize,
    pub mode: TimerMode,
    /// Epoch millis when a running countdown reaches zero.
    pub timer_end: Option<i64>,
    /// Epoch millis a running stopwatch would have started from zero.
    pub timer_start: Option<i64>,
    /// Shown while paused; seconds remaining or elapsed.
    pub value_secs: u64,
    pub paused: bool,
    pub complete: bool,
}

impl SessionProjection {
    /// `synced_at` is the instant the timer value was exact; the absolute
    /// end or start is anchored there.
    pub fn from_state(state: &SessionState, synced_at: DateTime<Utc>) -> Self {
        let current = state.current();
        let total_sets = current.as_ref().map(|c| c.exercise.set_count()).unwrap_or(0);
        let timer = state.timer();
        let synced_ms = synced_at.timestamp_millis();
        let value_ms = i64::try_from(timer.value_secs())
            .unwrap_or(i64::MAX / 1000)
            .saturating_mul(1000);

        let (timer_end, timer_start) = match (timer.is_running(), timer.clock()) {
            (true, TimerClock::Countdown { .. }) => (Some(synced_ms.saturating_add(value_ms)), None),
            (true, TimerClock::Stopwatch { .. }) => (None, Some(synced_ms.saturating_sub(value_ms))),
            (false, _) => (None, None),
        };

        Self {
            exercise: current.map(|c| c.exercise.name).unwrap_or_default(),
            next: state.next_name().unwrap_or_else(|| END_OF_SESSION.to_string()),
            current_set: (state.set_index() + 1).min(total_sets),
            total_sets,
            mode: timer.mode(),
            timer_end,
            timer_start,
            value_secs: timer.value_secs(),
            paused: !timer.is_running(),
            complete: state.is_complete(),
        }
    }
}

/// Publish the projection, or clear it with `None`.
pub fn publish(prefs: &dyn PreferenceStore, projection: Option<&SessionProjection>) -> Result<()> {
    match projection {
        Some(p) => prefs.set(PROJECTION_KEY, &serde_json::to_string(p)?),
        None => prefs.remove(PROJECTION_KEY),
    }
}

pub fn load(prefs: &dyn PreferenceStore) -> Option<SessionProjection> {
    let raw = prefs.get(PROJECTION_KEY).ok().flatten()?;
    match serde_json::from_str(&raw) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %e, "malformed session projection");
            None
        }
    }
}

/// Sessions in the last 30 days against the monthly goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeSummary {
    pub count: u64,
    pub goal: u32,
}

pub fn publish_home_summary(prefs: &dyn PreferenceStore, summary: HomeSummary) -> Result<()> {
    prefs.set(HOME_SUMMARY_KEY, &serde_json::to_string(&summary)?)
}
