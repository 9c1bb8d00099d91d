use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::surface::Command;
use crate::timer::TimerMode;

/// Every state change of the active session produces an Event.
/// Front-ends print or render them; the controller keeps them until drained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        routine_id: i64,
        routine_name: String,
        exercise_count: usize,
    },
    SessionRestored {
        session_id: Uuid,
        exercise_index: usize,
        set_index: usize,
        elapsed_secs: u64,
    },
    SetCompleted {
        exercise_index: usize,
        set_index: usize,
        rest_secs: u64,
    },
    SetLogged {
        exercise_index: usize,
        set_index: usize,
        reps: Option<String>,
        weight: Option<f64>,
    },
    ExerciseCompleted {
        exercise_index: usize,
        name: String,
        sets: usize,
        rest_secs: u64,
    },
    /// The last exercise was completed; waiting for finalize or a new exercise.
    SessionCompleted {
        exercises_done: usize,
    },
    TimerToggled {
        running: bool,
        value_secs: u64,
    },
    TimerAdjusted {
        value_secs: u64,
    },
    TimerReset {
        value_secs: u64,
    },
    TimerModeChanged {
        mode: TimerMode,
        value_secs: u64,
    },
    /// Rest countdown reached zero. `while_away` is set when the zero
    /// crossing happened while the process was not running.
    TimerFinished {
        exercise_index: usize,
        set_index: usize,
        while_away: bool,
    },
    ExerciseJumped {
        from: usize,
        to: usize,
    },
    ExerciseAdded {
        index: usize,
        name: String,
        permanent: bool,
    },
    ExerciseDeleted {
        index: usize,
        name: String,
    },
    SetDeleted {
        exercise_index: usize,
        set_index: usize,
        sets_left: usize,
    },
    CommandReceived {
        command: Command,
    },
    SessionFinalized {
        history_id: i64,
        name: String,
        details: usize,
    },
    SessionCancelled {
        session_id: Uuid,
    },
}
