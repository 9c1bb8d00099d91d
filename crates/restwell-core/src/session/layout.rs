//! Layered view of a session's exercise list.
//!
//! The visible list is computed on demand from four collections: the
//! routine's base exercises, session-only extras, per-exercise overrides and
//! hidden entries. The base list is never edited for a session-scoped change.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::routine::Exercise;

/// Stable identity of an exercise within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ExerciseKey {
    /// Backed by a routine store row.
    Permanent(i64),
    /// Exists only in this session.
    Temporary(u32),
}

impl fmt::Display for ExerciseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExerciseKey::Permanent(id) => write!(f, "p:{id}"),
            ExerciseKey::Temporary(tag) => write!(f, "t:{tag}"),
        }
    }
}

impl FromStr for ExerciseKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, raw) = s
            .split_once(':')
            .ok_or_else(|| format!("malformed exercise key: {s}"))?;
        match kind {
            "p" => raw
                .parse()
                .map(ExerciseKey::Permanent)
                .map_err(|e| format!("bad permanent key {s}: {e}")),
            "t" => raw
                .parse()
                .map(ExerciseKey::Temporary)
                .map_err(|e| format!("bad temporary key {s}: {e}")),
            _ => Err(format!("unknown exercise key kind: {s}")),
        }
    }
}

impl From<ExerciseKey> for String {
    fn from(key: ExerciseKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ExerciseKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Session-only replacement fields for one exercise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseOverride {
    #[serde(default)]
    pub rest_times: Option<Vec<u64>>,
    #[serde(default)]
    pub set_reps: Option<Vec<String>>,
}

impl ExerciseOverride {
    fn apply(&self, exercise: &mut Exercise) {
        if let Some(rest_times) = &self.rest_times {
            exercise.rest_times = rest_times.clone();
        }
        if let Some(set_reps) = &self.set_reps {
            exercise.set_reps = set_reps.clone();
        }
    }
}

/// One entry of the visible list.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionExercise {
    pub key: ExerciseKey,
    pub exercise: Exercise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TemporaryExercise {
    tag: u32,
    exercise: Exercise,
}

/// How an entry leaves the visible list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Hide a routine exercise for this session only.
    Hide,
    /// Drop the entry from the layout entirely.
    Drop,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseLayout {
    /// Reloaded from the routine store on every rehydration.
    #[serde(skip)]
    base: Vec<Exercise>,
    #[serde(default)]
    extras: Vec<TemporaryExercise>,
    #[serde(default)]
    overrides: BTreeMap<ExerciseKey, ExerciseOverride>,
    #[serde(default)]
    hidden: BTreeSet<ExerciseKey>,
    #[serde(default)]
    next_tag: u32,
}

impl ExerciseLayout {
    pub fn new(base: Vec<Exercise>) -> Self {
        let mut layout = Self::default();
        layout.set_base(base);
        layout
    }

    /// Replace the base list. Entries without a permanent id become extras.
    pub fn set_base(&mut self, base: Vec<Exercise>) {
        self.base.clear();
        for exercise in base {
            if exercise.id.is_some() {
                self.base.push(exercise);
            } else {
                self.push_temporary(exercise);
            }
        }
    }

    pub fn base_ids(&self) -> Vec<i64> {
        self.base.iter().filter_map(|e| e.id).collect()
    }

    /// The visible list: base entries then extras, minus hidden, overrides applied.
    pub fn entries(&self) -> Vec<SessionExercise> {
        self.visible()
            .map(|(key, exercise)| self.materialize(key, exercise))
            .collect()
    }

    /// Visible entries in order, borrowed and without overrides applied.
    fn visible(&self) -> impl Iterator<Item = (ExerciseKey, &Exercise)> + '_ {
        let base = self.base.iter().filter_map(|exercise| {
            exercise.id.map(|id| (ExerciseKey::Permanent(id), exercise))
        });
        let extras = self
            .extras
            .iter()
            .map(|t| (ExerciseKey::Temporary(t.tag), &t.exercise));

        base.chain(extras)
            .filter(|(key, _)| !self.hidden.contains(key))
    }

    fn materialize(&self, key: ExerciseKey, exercise: &Exercise) -> SessionExercise {
        let mut exercise = exercise.clone();
        if let Some(layer) = self.overrides.get(&key) {
            layer.apply(&mut exercise);
        }
        SessionExercise { key, exercise }
    }

    pub fn len(&self) -> usize {
        self.visible().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<SessionExercise> {
        self.visible()
            .nth(index)
            .map(|(key, exercise)| self.materialize(key, exercise))
    }

    pub fn index_of(&self, key: ExerciseKey) -> Option<usize> {
        self.visible().position(|(visible, _)| visible == key)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.exercise.name).collect()
    }

    /// Append a session-only entry.
    pub fn push_temporary(&mut self, mut exercise: Exercise) -> ExerciseKey {
        exercise.id = None;
        let tag = self.next_tag;
        self.next_tag += 1;
        self.extras.push(TemporaryExercise { tag, exercise });
        ExerciseKey::Temporary(tag)
    }

    /// Append an entry that already has a permanent id.
    pub fn push_permanent(&mut self, exercise: Exercise) -> Option<ExerciseKey> {
        let id = exercise.id?;
        self.base.push(exercise);
        Some(ExerciseKey::Permanent(id))
    }

    /// Remove `key` from the visible list. Session-only entries are always dropped.
    pub fn remove(&mut self, key: ExerciseKey, removal: Removal) {
        match key {
            ExerciseKey::Temporary(tag) => self.extras.retain(|t| t.tag != tag),
            ExerciseKey::Permanent(id) => match removal {
                Removal::Hide => {
                    self.hidden.insert(key);
                }
                Removal::Drop => self.base.retain(|e| e.id != Some(id)),
            },
        }
        if matches!(key, ExerciseKey::Temporary(_)) || removal == Removal::Drop {
            self.overrides.remove(&key);
        }
    }

    pub fn set_override(&mut self, key: ExerciseKey, layer: ExerciseOverride) {
        self.overrides.insert(key, layer);
    }
}
