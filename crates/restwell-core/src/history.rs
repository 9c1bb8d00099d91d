//! History records produced when a session is finalized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the record written after every exercise was completed.
pub const SESSION_COMPLETE: &str = "Session complete";

/// Name of the record written when the user finished early.
pub const SESSION_ENDED: &str = "Session ended";

/// Per-exercise summary accumulated while the session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub name: String,
    pub sets: usize,
    /// Reps performed per set; `None` where nothing was captured.
    #[serde(default)]
    pub reps: Vec<Option<String>>,
    #[serde(default)]
    pub weights: Vec<Option<f64>>,
}

/// Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub set_count: usize,
    pub timestamp: DateTime<Utc>,
    pub routine_name: String,
    pub details: Vec<ExerciseSummary>,
}

pub trait HistoryStore {
    fn append(&self, record: &HistoryRecord) -> Result<i64>;

    /// Records written at or after `since`.
    fn count_since(&self, since: DateTime<Utc>) -> Result<u64>;
}
