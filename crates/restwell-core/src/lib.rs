//! # Restwell Core Library
//!
//! This library provides the core logic for Restwell, a strength-training
//! session tracker. Everything is available through the standalone `restwell`
//! CLI; other front-ends are thin layers over the same library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A logical-second countdown/stopwatch state machine that
//!   requires the caller to invoke `tick()` once per second
//! - **Session State**: Exercise/set pointers, session-scoped edits layered
//!   over the routine, captured sets and the results accumulator
//! - **Persistence**: Debounced snapshots in a key-value store, with
//!   wall-clock reconciliation on restart
//! - **Surfaces**: Status projection for widgets, notifications and a
//!   single-slot command mailbox
//! - **Storage**: SQLite routines/history/kv and TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Rest timer state machine
//! - [`SessionState`]: The transition API
//! - [`SessionController`]: Owner of the one active session
//! - [`Database`]: Routine, history and preference persistence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod controller;
pub mod error;
pub mod events;
pub mod feedback;
pub mod history;
pub mod persistence;
pub mod routine;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod surface;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{Action, SessionConfig, SessionController, Stores, Surfaces};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use history::{ExerciseSummary, HistoryRecord, HistoryStore};
pub use routine::{Exercise, Routine, RoutineStore, FREE_ROUTINE_ID};
pub use runtime::run_session;
pub use session::{SessionPhase, SessionState};
pub use storage::{Config, Database, MemoryPreferences, PreferenceStore};
pub use surface::{Command, SessionProjection};
pub use timer::{TimerEngine, TimerMode};
