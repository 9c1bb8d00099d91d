//! Routine catalog model and the store interface the session reads from.
//!
//! Routine CRUD lives outside the session engine; the session only needs
//! to read a routine's exercises at start and, in free mode, write through
//! the exercises it adds or removes.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Routine id reserved for the unassigned ("free") workout.
pub const FREE_ROUTINE_ID: i64 = 0;

/// Display name used for the free workout.
pub const FREE_ROUTINE_NAME: &str = "Free workout";

/// One exercise as stored in a routine.
///
/// An exercise with N sets carries N-1 rest durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Permanent id; `None` for an entry that only exists in one session.
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    /// Seconds of rest after each set except the last.
    pub rest_times: Vec<u64>,
    /// Target reps per set, e.g. `["12", "10", "8"]`.
    #[serde(default)]
    pub set_reps: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl Exercise {
    pub fn new(name: impl Into<String>, rest_times: Vec<u64>) -> Self {
        Self {
            id: None,
            name: name.into(),
            rest_times,
            set_reps: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn with_reps(mut self, set_reps: Vec<String>) -> Self {
        self.set_reps = set_reps;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn set_count(&self) -> usize {
        self.rest_times.len() + 1
    }

    pub fn first_rest(&self) -> Option<u64> {
        self.rest_times.first().copied()
    }

    pub fn last_rest(&self) -> Option<u64> {
        self.rest_times.last().copied()
    }

    /// Rest that follows `set_index`, if any.
    pub fn rest_after(&self, set_index: usize) -> Option<u64> {
        self.rest_times.get(set_index).copied()
    }

    pub fn target_reps(&self, set_index: usize) -> Option<&str> {
        self.set_reps
            .get(set_index)
            .map(String::as_str)
            .filter(|r| !r.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: i64,
    pub name: String,
    pub exercises: Vec<Exercise>,
}

/// Permanent routine catalog.
pub trait RoutineStore {
    /// Routine header plus its ordered exercises.
    fn routine(&self, id: i64) -> Result<Option<Routine>>;

    /// Ordered exercises of a routine.
    fn exercises(&self, routine_id: i64) -> Result<Vec<Exercise>>;

    /// Append an exercise to a routine, returning its permanent id.
    fn add_exercise(&self, routine_id: i64, exercise: &Exercise) -> Result<i64>;

    fn delete_exercise(&self, exercise_id: i64) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_count_is_rests_plus_one() {
        let ex = Exercise::new("Bench Press", vec![90, 90, 90]);
        assert_eq!(ex.set_count(), 4);
        assert_eq!(ex.first_rest(), Some(90));
        assert_eq!(ex.rest_after(3), None);
    }

    #[test]
    fn single_set_exercise_has_no_rest() {
        let ex = Exercise::new("Plank", vec![]);
        assert_eq!(ex.set_count(), 1);
        assert_eq!(ex.last_rest(), None);
    }

    #[test]
    fn blank_target_reps_are_ignored() {
        let ex = Exercise::new("Row", vec![60])
            .with_reps(vec!["12".into(), String::new()]);
        assert_eq!(ex.target_reps(0), Some("12"));
        assert_eq!(ex.target_reps(1), None);
        assert_eq!(ex.target_reps(5), None);
    }
}
