//! Session state store: the exercise layout and the transition API.

mod layout;
mod state;


pub use layout::{ExerciseKey, ExerciseLayout, ExerciseOverride, Removal, SessionExercise};
pub use state::{SessionPhase, SessionState, SetEntry};
