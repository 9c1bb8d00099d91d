//! Durable session snapshots and rehydration.
//!
//! Two artifacts live in the preference store:
//!
//! - `session_snapshot`: pointers, timer clock, running flag, the
//!   wall-clock stamp of the write and the instant the timer value was
//!   last exact. Enough to redraw immediately.
//! - `session_record`: session-scoped exercise edits, captured sets,
//!   completion tracking and the results accumulator.
//!
//! The sync instant only ever moves by whole consumed seconds, so
//! rehydrating and writing back in quick succession never loses the
//! sub-second remainder of a running timer.
//!
//! Anything unreadable is treated as absent; rehydration then reports
//! nothing to restore and the caller starts fresh.

mod writer;

pub use writer::DebouncedWriter;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::history::ExerciseSummary;
use crate::routine::{Exercise, RoutineStore, FREE_ROUTINE_ID};
use crate::session::{ExerciseKey, ExerciseLayout, SessionPhase, SessionState, SetEntry};
use crate::storage::PreferenceStore;
use crate::timer::{Tick, TimerClock, TimerEngine};

pub const SNAPSHOT_KEY: &str = "session_snapshot";
pub const RECORD_KEY: &str = "session_record";

/// Lightweight display state, stamped with the wall clock at write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub routine_id: i64,
    pub exercise_index: usize,
    pub set_index: usize,
    pub timer: TimerClock,
    pub running: bool,
    pub saved_at_ms: i64,
    /// Epoch millis at which `timer` was exact. Older snapshots lack it and
    /// fall back to `saved_at_ms`.
    #[serde(default)]
    pub synced_at_ms: Option<i64>,
    #[serde(default)]
    pub exercise: String,
    #[serde(default)]
    pub total_sets: usize,
}

impl SessionSnapshot {
    pub fn capture(state: &SessionState, synced_at: DateTime<Utc>, at: DateTime<Utc>) -> Self {
        let current = state.current();
        Self {
            routine_id: state.routine_id(),
            exercise_index: state.exercise_index(),
            set_index: state.set_index(),
            timer: state.timer().clock(),
            running: state.timer().is_running(),
            saved_at_ms: at.timestamp_millis(),
            synced_at_ms: Some(synced_at.timestamp_millis()),
            exercise: current
                .as_ref()
                .map(|c| c.exercise.name.clone())
                .unwrap_or_default(),
            total_sets: current.map(|c| c.exercise.set_count()).unwrap_or(0),
        }
    }
}

/// Full-fidelity session data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub version: u32,
    pub session_id: Uuid,
    pub routine_id: i64,
    pub routine_name: String,
    pub exercise_index: usize,
    pub set_index: usize,
    pub phase: SessionPhase,
    pub layout: ExerciseLayout,
    /// Free mode only: the stored exercises this session added, in order.
    #[serde(default)]
    pub free_ids: Vec<i64>,
    #[serde(default)]
    pub completed: BTreeSet<ExerciseKey>,
    #[serde(default)]
    pub captured: BTreeMap<ExerciseKey, Vec<SetEntry>>,
    #[serde(default)]
    pub results: Vec<ExerciseSummary>,
}

impl SessionRecord {
    pub const VERSION: u32 = 1;
}

/// A session rebuilt from durable storage.
#[derive(Debug)]
pub struct Rehydrated {
    pub state: SessionState,
    /// Whole seconds folded into the timer since it was last exact.
    pub elapsed_secs: u64,
    /// The instant the restored timer value is exact at. Trails `now` by
    /// less than a second while running.
    pub synced_at: DateTime<Utc>,
    /// The countdown ran out while the process was away.
    pub finished: bool,
}

/// Write both artifacts.
pub fn write(
    prefs: &dyn PreferenceStore,
    state: &SessionState,
    synced_at: DateTime<Utc>,
    at: DateTime<Utc>,
) -> Result<()> {
    let snapshot = serde_json::to_string(&SessionSnapshot::capture(state, synced_at, at))?;
    let record = serde_json::to_string(&state.to_record())?;
    prefs.set(SNAPSHOT_KEY, &snapshot)?;
    prefs.set(RECORD_KEY, &record)?;
    Ok(())
}

/// Remove both artifacts. Removing what is not there is fine.
pub fn clear(prefs: &dyn PreferenceStore) -> Result<()> {
    prefs.remove(SNAPSHOT_KEY)?;
    prefs.remove(RECORD_KEY)?;
    Ok(())
}

pub fn load_snapshot(prefs: &dyn PreferenceStore) -> Option<SessionSnapshot> {
    load(prefs, SNAPSHOT_KEY)
}

pub fn load_record(prefs: &dyn PreferenceStore) -> Option<SessionRecord> {
    load::<SessionRecord>(prefs, RECORD_KEY).filter(is_supported)
}

/// Routine of the persisted session, if one is stored.
///
/// # Errors
/// Returns an error when the preference store can not be read. A malformed
/// record counts as nothing stored.
pub fn active_routine_id(prefs: &dyn PreferenceStore) -> Result<Option<i64>> {
    let Some(raw) = prefs.get(RECORD_KEY)? else {
        return Ok(None);
    };
    Ok(parse::<SessionRecord>(&raw, RECORD_KEY)
        .filter(is_supported)
        .map(|r| r.routine_id))
}

fn is_supported(record: &SessionRecord) -> bool {
    let supported = record.version == SessionRecord::VERSION;
    if !supported {
        warn!(version = record.version, "unsupported session record version, ignoring");
    }
    supported
}

/// Rebuild the session for `routine_id` and fold in the wall-clock time
/// that passed since the last snapshot.
///
/// Returns `None` when nothing matching is stored or the stored data can
/// not be used.
pub fn rehydrate(
    prefs: &dyn PreferenceStore,
    routines: &dyn RoutineStore,
    routine_id: i64,
    now: DateTime<Utc>,
    fallback_rest_secs: u64,
) -> Option<Rehydrated> {
    let record = load_record(prefs)?;
    if record.routine_id != routine_id {
        debug!(
            stored = record.routine_id,
            requested = routine_id,
            "stored session belongs to another routine"
        );
        return None;
    }

    let base = match load_base(routines, &record) {
        Ok(base) => base,
        Err(e) => {
            warn!(error = %e, routine_id, "could not reload routine for stored session");
            return None;
        }
    };
    let mut state = SessionState::from_record(record, base, fallback_rest_secs);

    let Some(snapshot) = load_snapshot(prefs).filter(|s| s.routine_id == routine_id) else {
        return Some(Rehydrated {
            state,
            elapsed_secs: 0,
            synced_at: now,
            finished: false,
        });
    };

    // A snapshot taken on another exercise than the record carries a stale timer.
    if snapshot.exercise_index != state.exercise_index() || snapshot.set_index != state.set_index() {
        return Some(Rehydrated {
            state,
            elapsed_secs: 0,
            synced_at: now,
            finished: false,
        });
    }

    let synced_at_ms = snapshot.synced_at_ms.unwrap_or(snapshot.saved_at_ms);
    let elapsed_secs = whole_secs_since(synced_at_ms, now);
    state.restore_timer(TimerEngine::from_parts(snapshot.timer, snapshot.running));
    let finished = state.reconcile_timer(elapsed_secs) == Tick::Finished;

    let synced_at = if state.timer().is_running() {
        advance_ms(synced_at_ms, elapsed_secs)
    } else {
        now
    };

    Some(Rehydrated {
        state,
        elapsed_secs,
        synced_at,
        finished,
    })
}

/// Whole seconds from `since_ms` to `now`; zero when the clock went backwards.
pub fn whole_secs_since(since_ms: i64, now: DateTime<Utc>) -> u64 {
    let elapsed_ms = now.timestamp_millis().saturating_sub(since_ms).max(0);
    u64::try_from(elapsed_ms / 1000).unwrap_or(0)
}

fn advance_ms(since_ms: i64, secs: u64) -> DateTime<Utc> {
    let step_ms = i64::try_from(secs).unwrap_or(i64::MAX / 1000).saturating_mul(1000);
    Utc.timestamp_millis_opt(since_ms.saturating_add(step_ms))
        .single()
        .unwrap_or_default()
}

fn load_base(routines: &dyn RoutineStore, record: &SessionRecord) -> Result<Vec<Exercise>> {
    if record.routine_id == FREE_ROUTINE_ID {
        let stored = routines.exercises(FREE_ROUTINE_ID)?;
        Ok(record
            .free_ids
            .iter()
            .filter_map(|id| stored.iter().find(|e| e.id == Some(*id)).cloned())
            .collect())
    } else {
        routines.exercises(record.routine_id)
    }
}

fn load<T: DeserializeOwned>(prefs: &dyn PreferenceStore, key: &str) -> Option<T> {
    let raw = match prefs.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, key, "could not read persisted session state");
            return None;
        }
    };
    parse(&raw, key)
}

fn parse<T: DeserializeOwned>(raw: &str, key: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, key, "malformed persisted session state, ignoring");
            None
        }
    }
}
