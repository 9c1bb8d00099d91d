//! The in-memory model of one workout session and its transition API.
//!
//! Transitions return `Some(Event)` when they changed something and `None`
//! when a precondition refused them. A refused transition leaves the state
//! untouched.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::layout::{ExerciseKey, ExerciseLayout, ExerciseOverride, Removal, SessionExercise};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::history::{ExerciseSummary, HistoryRecord, SESSION_COMPLETE, SESSION_ENDED};
use crate::persistence::SessionRecord;
use crate::routine::{Exercise, RoutineStore, FREE_ROUTINE_ID, FREE_ROUTINE_NAME};
use crate::timer::{Tick, TimerEngine, TimerMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Active,
    /// Final set of the final exercise is done. Only `finalize` or
    /// `add_exercise` move the session on.
    Complete,
}

/// What was actually performed in one set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetEntry {
    #[serde(default)]
    pub reps: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    session_id: Uuid,
    routine_id: i64,
    routine_name: String,
    layout: ExerciseLayout,
    exercise_index: usize,
    set_index: usize,
    phase: SessionPhase,
    timer: TimerEngine,
    completed: BTreeSet<ExerciseKey>,
    captured: BTreeMap<ExerciseKey, Vec<SetEntry>>,
    results: Vec<ExerciseSummary>,
    fallback_rest_secs: u64,
}

impl SessionState {
    /// Load the routine and sit on its first set with the timer paused.
    pub fn start(
        routines: &dyn RoutineStore,
        routine_id: i64,
        fallback_rest_secs: u64,
    ) -> Result<Self> {
        let (routine_name, base) = if routine_id == FREE_ROUTINE_ID {
            (FREE_ROUTINE_NAME.to_string(), Vec::new())
        } else {
            let routine = routines
                .routine(routine_id)?
                .ok_or(CoreError::RoutineNotFound(routine_id))?;
            (routine.name, routine.exercises)
        };

        let mut state = Self {
            session_id: Uuid::new_v4(),
            routine_id,
            routine_name,
            layout: ExerciseLayout::new(base),
            exercise_index: 0,
            set_index: 0,
            phase: SessionPhase::Active,
            timer: TimerEngine::countdown(fallback_rest_secs),
            completed: BTreeSet::new(),
            captured: BTreeMap::new(),
            results: Vec::new(),
            fallback_rest_secs,
        };
        state.timer = TimerEngine::countdown(state.current_rest());
        Ok(state)
    }

    /// Rebuild from a persisted record over a freshly loaded base list.
    /// Pointers are clamped into range; the timer is left paused on the
    /// current set's rest.
    pub(crate) fn from_record(
        record: SessionRecord,
        base: Vec<Exercise>,
        fallback_rest_secs: u64,
    ) -> Self {
        let mut layout = record.layout;
        layout.set_base(base);

        let mut state = Self {
            session_id: record.session_id,
            routine_id: record.routine_id,
            routine_name: record.routine_name,
            layout,
            exercise_index: record.exercise_index,
            set_index: record.set_index,
            phase: record.phase,
            timer: TimerEngine::countdown(fallback_rest_secs),
            completed: record.completed,
            captured: record.captured,
            results: record.results,
            fallback_rest_secs,
        };
        state.clamp_pointers();
        state.timer = TimerEngine::countdown(state.current_rest());
        state
    }

    pub(crate) fn to_record(&self) -> SessionRecord {
        SessionRecord {
            version: SessionRecord::VERSION,
            session_id: self.session_id,
            routine_id: self.routine_id,
            routine_name: self.routine_name.clone(),
            exercise_index: self.exercise_index,
            set_index: self.set_index,
            phase: self.phase,
            layout: self.layout.clone(),
            free_ids: if self.is_free() {
                self.layout.base_ids()
            } else {
                Vec::new()
            },
            completed: self.completed.clone(),
            captured: self.captured.clone(),
            results: self.results.clone(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn routine_id(&self) -> i64 {
        self.routine_id
    }

    pub fn routine_name(&self) -> &str {
        &self.routine_name
    }

    pub fn is_free(&self) -> bool {
        self.routine_id == FREE_ROUTINE_ID
    }

    pub fn exercise_index(&self) -> usize {
        self.exercise_index
    }

    pub fn set_index(&self) -> usize {
        self.set_index
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    pub fn exercises(&self) -> Vec<SessionExercise> {
        self.layout.entries()
    }

    pub fn exercise_names(&self) -> Vec<String> {
        self.layout.names()
    }

    pub fn current(&self) -> Option<SessionExercise> {
        self.layout.get(self.exercise_index)
    }

    pub fn next_name(&self) -> Option<String> {
        self.layout
            .get(self.exercise_index + 1)
            .map(|e| e.exercise.name)
    }

    /// Visible indices of exercises whose final set was logged.
    pub fn completed_indices(&self) -> Vec<usize> {
        self.layout
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| self.completed.contains(&e.key))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn results(&self) -> &[ExerciseSummary] {
        &self.results
    }

    pub fn set_entries(&self, index: usize) -> Vec<SetEntry> {
        self.layout
            .get(index)
            .and_then(|e| self.captured.get(&e.key).cloned())
            .unwrap_or_default()
    }

    /// Rest shown for the current set: its own rest, the last rest on the
    /// final set, or the fallback.
    pub fn current_rest(&self) -> u64 {
        self.current()
            .and_then(|c| {
                let rests = &c.exercise.rest_times;
                rests.get(self.set_index.min(rests.len().saturating_sub(1))).copied()
            })
            .unwrap_or(self.fallback_rest_secs)
    }

    // ── Progression ──────────────────────────────────────────────────

    /// Log the current set and start the rest that follows it. On the final
    /// set this completes the exercise instead.
    pub fn complete_set(&mut self) -> Option<Event> {
        if self.is_complete() {
            debug!("complete_set ignored: session already complete");
            return None;
        }
        let Some(current) = self.current() else {
            debug!("complete_set ignored: no current exercise");
            return None;
        };
        self.mark_set_done(&current);

        let finished_set = self.set_index;
        match current.exercise.rest_after(finished_set) {
            Some(rest) => {
                self.set_index += 1;
                self.timer.configure(TimerMode::Countdown, rest);
                self.timer.start();
                Some(Event::SetCompleted {
                    exercise_index: self.exercise_index,
                    set_index: finished_set,
                    rest_secs: rest,
                })
            }
            None => {
                let carry = current
                    .exercise
                    .last_rest()
                    .unwrap_or(self.fallback_rest_secs);
                self.complete_exercise(carry)
            }
        }
    }

    /// Record the current exercise in the results and move to the next one,
    /// starting `carry_rest_secs` of rest. After the last exercise the
    /// session enters `Complete` with the timer paused.
    pub fn complete_exercise(&mut self, carry_rest_secs: u64) -> Option<Event> {
        if self.is_complete() {
            return None;
        }
        let current = self.current()?;
        let summary = self.summarize(&current);
        self.results.push(summary);
        self.completed.insert(current.key);

        if self.exercise_index + 1 < self.layout.len() {
            let finished = self.exercise_index;
            let sets = current.exercise.set_count();
            self.exercise_index += 1;
            self.set_index = 0;
            self.timer.configure(TimerMode::Countdown, carry_rest_secs);
            self.timer.start();
            Some(Event::ExerciseCompleted {
                exercise_index: finished,
                name: current.exercise.name,
                sets,
                rest_secs: carry_rest_secs,
            })
        } else {
            self.phase = SessionPhase::Complete;
            self.timer.pause();
            Some(Event::SessionCompleted {
                exercises_done: self.results.len(),
            })
        }
    }

    /// Capture reps/weight for the current set.
    pub fn log_set(&mut self, reps: Option<String>, weight: Option<f64>) -> Option<Event> {
        if self.is_complete() || (reps.is_none() && weight.is_none()) {
            return None;
        }
        let current = self.current()?;
        let set_index = self.set_index;
        let entry = &mut self.entries_mut(&current)[set_index];
        if reps.is_some() {
            entry.reps = reps.clone();
        }
        if weight.is_some() {
            entry.weight = weight;
        }
        Some(Event::SetLogged {
            exercise_index: self.exercise_index,
            set_index,
            reps,
            weight,
        })
    }

    /// Navigate to another exercise. Unlike forward progression the timer
    /// does not start.
    pub fn jump_to_exercise(&mut self, index: usize) -> Option<Event> {
        if index >= self.layout.len() || (index == self.exercise_index && !self.is_complete()) {
            return None;
        }
        let from = self.exercise_index;
        self.exercise_index = index;
        self.set_index = 0;
        self.phase = SessionPhase::Active;
        self.timer = TimerEngine::countdown(self.current_rest());
        Some(Event::ExerciseJumped { from, to: index })
    }

    // ── Session-scoped edits ─────────────────────────────────────────

    /// Append an exercise and move onto its first set. In free mode the
    /// entry is written to the routine store first; if that fails it stays
    /// session-only.
    pub fn add_exercise(&mut self, routines: &dyn RoutineStore, entry: Exercise) -> Option<Event> {
        let name = entry.name.clone();
        let key = if self.is_free() {
            match routines.add_exercise(FREE_ROUTINE_ID, &entry) {
                Ok(id) => self.layout.push_permanent(Exercise {
                    id: Some(id),
                    ..entry
                }),
                Err(e) => {
                    warn!(error = %e, exercise = %name, "free-mode write-through failed, keeping exercise session-only");
                    Some(self.layout.push_temporary(entry))
                }
            }
        } else {
            Some(self.layout.push_temporary(entry))
        }?;

        let index = self.layout.index_of(key)?;
        self.exercise_index = index;
        self.set_index = 0;
        self.phase = SessionPhase::Active;
        self.timer = TimerEngine::countdown(self.current_rest());
        Some(Event::ExerciseAdded {
            index,
            name,
            permanent: matches!(key, ExerciseKey::Permanent(_)),
        })
    }

    /// Remove an exercise from this session's list. Refused when it would
    /// empty the list. Only free mode touches the routine store.
    pub fn delete_exercise(&mut self, routines: &dyn RoutineStore, index: usize) -> Option<Event> {
        let len = self.layout.len();
        if len <= 1 || index >= len {
            debug!(index, len, "delete_exercise refused");
            return None;
        }
        let target = self.layout.get(index)?;

        let removal = if self.is_free() {
            if let ExerciseKey::Permanent(id) = target.key {
                if let Err(e) = routines.delete_exercise(id) {
                    warn!(error = %e, id, "free-mode delete failed, removing from session only");
                }
            }
            Removal::Drop
        } else {
            Removal::Hide
        };
        self.layout.remove(target.key, removal);
        self.captured.remove(&target.key);
        self.completed.remove(&target.key);

        let new_len = len - 1;
        if index < self.exercise_index {
            self.exercise_index -= 1;
        } else if index == self.exercise_index {
            if index == new_len {
                self.exercise_index -= 1;
            }
            self.set_index = 0;
            self.timer = TimerEngine::countdown(self.current_rest());
        }

        Some(Event::ExerciseDeleted {
            index,
            name: target.exercise.name,
        })
    }

    /// Drop one set of the current exercise for this session.
    pub fn delete_set(&mut self, index: usize) -> Option<Event> {
        let current = self.current()?;
        let exercise = &current.exercise;
        if exercise.rest_times.is_empty() || index >= exercise.set_count() {
            debug!(index, sets = exercise.set_count(), "delete_set refused");
            return None;
        }

        let mut rest_times = exercise.rest_times.clone();
        rest_times.remove(index.min(rest_times.len() - 1));
        let mut set_reps = exercise.set_reps.clone();
        if index < set_reps.len() {
            set_reps.remove(index);
        }
        let sets_left = rest_times.len() + 1;
        self.layout.set_override(
            current.key,
            ExerciseOverride {
                rest_times: Some(rest_times),
                set_reps: Some(set_reps),
            },
        );
        if let Some(entries) = self.captured.get_mut(&current.key) {
            if index < entries.len() {
                entries.remove(index);
            }
        }
        if self.set_index >= sets_left {
            self.set_index = sets_left - 1;
        }

        Some(Event::SetDeleted {
            exercise_index: self.exercise_index,
            set_index: index,
            sets_left,
        })
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn toggle_timer(&mut self) -> Option<Event> {
        self.current()?;
        let running = self.timer.toggle();
        Some(Event::TimerToggled {
            running,
            value_secs: self.timer.value_secs(),
        })
    }

    pub fn reset_timer(&mut self) -> Option<Event> {
        self.current()?;
        self.timer.reset();
        Some(Event::TimerReset {
            value_secs: self.timer.value_secs(),
        })
    }

    pub fn adjust_timer(&mut self, delta_secs: i64) -> Option<Event> {
        if delta_secs == 0 {
            return None;
        }
        self.current()?;
        let value_secs = self.timer.adjust(delta_secs);
        Some(Event::TimerAdjusted { value_secs })
    }

    pub fn switch_timer_mode(&mut self, mode: TimerMode) -> Option<Event> {
        if self.timer.mode() == mode {
            return None;
        }
        self.current()?;
        self.timer.configure(mode, self.current_rest());
        Some(Event::TimerModeChanged {
            mode,
            value_secs: self.timer.value_secs(),
        })
    }

    pub fn tick(&mut self) -> Tick {
        self.timer.tick()
    }

    pub(crate) fn restore_timer(&mut self, timer: TimerEngine) {
        self.timer = timer;
    }

    pub(crate) fn reconcile_timer(&mut self, elapsed_secs: u64) -> Tick {
        self.timer.reconcile(elapsed_secs)
    }

    // ── Finalization ─────────────────────────────────────────────────

    /// The history record this session would write right now.
    pub fn history_record(&self, at: DateTime<Utc>) -> HistoryRecord {
        let (name, set_count) = match self.phase {
            SessionPhase::Complete => (SESSION_COMPLETE, self.layout.len()),
            SessionPhase::Active => (SESSION_ENDED, self.exercise_index + 1),
        };
        HistoryRecord {
            id: None,
            name: name.to_string(),
            set_count,
            timestamp: at,
            routine_name: self.routine_name.clone(),
            details: self.results.clone(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn entries_mut(&mut self, current: &SessionExercise) -> &mut Vec<SetEntry> {
        let sets = current.exercise.set_count();
        let entries = self.captured.entry(current.key).or_default();
        if entries.len() < sets {
            entries.resize(sets, SetEntry::default());
        }
        entries
    }

    fn mark_set_done(&mut self, current: &SessionExercise) {
        let set_index = self.set_index;
        let target = current.exercise.target_reps(set_index).map(str::to_string);
        let entry = &mut self.entries_mut(current)[set_index];
        entry.done = true;
        if entry.reps.is_none() {
            entry.reps = target;
        }
    }

    fn summarize(&self, current: &SessionExercise) -> ExerciseSummary {
        let sets = current.exercise.set_count();
        let entries = self.captured.get(&current.key);
        let at = |i: usize| entries.and_then(|e| e.get(i));
        ExerciseSummary {
            name: current.exercise.name.clone(),
            sets,
            reps: (0..sets).map(|i| at(i).and_then(|e| e.reps.clone())).collect(),
            weights: (0..sets).map(|i| at(i).and_then(|e| e.weight)).collect(),
        }
    }

    fn clamp_pointers(&mut self) {
        let len = self.layout.len();
        if self.exercise_index >= len {
            self.exercise_index = len.saturating_sub(1);
            self.set_index = 0;
        }
        let max_set = self
            .current()
            .map(|c| c.exercise.rest_times.len())
            .unwrap_or(0);
        if self.set_index > max_set {
            self.set_index = max_set;
        }
    }
}
