//! SQLite-backed routine catalog, workout history and key-value store.
//!
//! Provides persistent storage for:
//! - Routines and their ordered exercises
//! - Finalized session history
//! - Key-value store for session snapshots and surface data

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::preferences::PreferenceStore;
use crate::error::{DatabaseError, Result};
use crate::history::{HistoryRecord, HistoryStore};
use crate::routine::{Exercise, Routine, RoutineStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineSummary {
    pub id: i64,
    pub name: String,
    pub exercise_count: usize,
}

/// SQLite database for routines, history and preferences.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/restwell/restwell.db`.
    ///
    /// Creates the database file and schema if they don't exist and seeds
    /// the default routines on first use.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("restwell.db");
        let db = Self::open_at(&path)?;
        db.seed_defaults()?;
        Ok(db)
    }

    /// Open (and migrate) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an empty in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS routines (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                name      TEXT NOT NULL,
                position  INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS exercises (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                routine_id  INTEGER NOT NULL,
                name        TEXT NOT NULL,
                rest_times  TEXT NOT NULL DEFAULT '[]',
                set_reps    TEXT NOT NULL DEFAULT '[]',
                notes       TEXT NOT NULL DEFAULT '',
                position    INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS history (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                name          TEXT NOT NULL,
                set_count     INTEGER NOT NULL,
                routine_name  TEXT NOT NULL,
                timestamp     TEXT NOT NULL,
                details       TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_exercises_routine ON exercises(routine_id, position);
            CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp);",
        )?;
        Ok(())
    }

    /// Insert the starter routines when the catalog is empty.
    pub fn seed_defaults(&self) -> Result<()> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM routines", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        let push = self.create_routine("Routine A - Chest/Triceps")?;
        for exercise in [
            Exercise::new("Bench Press", vec![90, 90, 90]).with_notes("Slow on the way down"),
            Exercise::new("Incline Press", vec![90, 90, 90]),
            Exercise::new("Cable Fly", vec![60, 60, 60]),
            Exercise::new("Triceps Pushdown", vec![60, 60, 60]),
        ] {
            self.add_exercise(push, &exercise)?;
        }

        let pull = self.create_routine("Routine B - Back/Biceps")?;
        for exercise in [
            Exercise::new("Lat Pulldown", vec![90, 90, 90]),
            Exercise::new("Seated Row", vec![90, 90, 90]),
            Exercise::new("Barbell Curl", vec![60, 60, 60]),
        ] {
            self.add_exercise(pull, &exercise)?;
        }
        Ok(())
    }

    pub fn create_routine(&self, name: &str) -> Result<i64> {
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM routines",
            [],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO routines (name, position) VALUES (?1, ?2)",
            params![name, position],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_routines(&self) -> Result<Vec<RoutineSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, COUNT(e.id)
             FROM routines r
             LEFT JOIN exercises e ON e.routine_id = r.id
             GROUP BY r.id
             ORDER BY r.position, r.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RoutineSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                exercise_count: row.get::<_, i64>(2)?.max(0) as usize,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Most recent history records first.
    pub fn history(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, set_count, routine_name, timestamp, details
             FROM history
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, DateTime<Utc>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, name, set_count, routine_name, timestamp, details) = row?;
            records.push(HistoryRecord {
                id: Some(id),
                name,
                set_count: set_count.max(0) as usize,
                timestamp,
                routine_name,
                details: decode_column("details", id, &details)?,
            });
        }
        Ok(records)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_remove(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl RoutineStore for Database {
    fn routine(&self, id: i64) -> Result<Option<Routine>> {
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM routines WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match name {
            Some(name) => Ok(Some(Routine {
                id,
                name,
                exercises: self.exercises(id)?,
            })),
            None => Ok(None),
        }
    }

    fn exercises(&self, routine_id: i64) -> Result<Vec<Exercise>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, rest_times, set_reps, notes
             FROM exercises
             WHERE routine_id = ?1
             ORDER BY position, id",
        )?;
        let rows = stmt.query_map(params![routine_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut exercises = Vec::new();
        for row in rows {
            let (id, name, rest_times, set_reps, notes) = row?;
            exercises.push(Exercise {
                id: Some(id),
                name,
                rest_times: decode_column("rest_times", id, &rest_times)?,
                set_reps: decode_column("set_reps", id, &set_reps)?,
                notes,
            });
        }
        Ok(exercises)
    }

    fn add_exercise(&self, routine_id: i64, exercise: &Exercise) -> Result<i64> {
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM exercises WHERE routine_id = ?1",
            params![routine_id],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO exercises (routine_id, name, rest_times, set_reps, notes, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                routine_id,
                exercise.name,
                serde_json::to_string(&exercise.rest_times)?,
                serde_json::to_string(&exercise.set_reps)?,
                exercise.notes,
                position,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn delete_exercise(&self, exercise_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM exercises WHERE id = ?1", params![exercise_id])?;
        Ok(())
    }
}

impl HistoryStore for Database {
    fn append(&self, record: &HistoryRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO history (name, set_count, routine_name, timestamp, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.name,
                record.set_count as i64,
                record.routine_name,
                record.timestamp,
                serde_json::to_string(&record.details)?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn count_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM history WHERE timestamp >= ?1",
            params![since],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

impl PreferenceStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.kv_get(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Ok(self.kv_set(key, value)?)
    }

    fn remove(&self, key: &str) -> Result<()> {
        Ok(self.kv_remove(key)?)
    }
}

fn decode_column<T: DeserializeOwned>(column: &str, row_id: i64, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        DatabaseError::CorruptColumn {
            column: column.to_string(),
            row_id,
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::ExerciseSummary;
    use chrono::Duration;

    #[test]
    fn seeded_routines_have_ordered_exercises() {
        let db = Database::open_memory().unwrap();
        db.seed_defaults().unwrap();
        let routines = db.list_routines().unwrap();
        assert_eq!(routines.len(), 2);
        assert_eq!(routines[0].exercise_count, 4);

        let routine = db.routine(routines[0].id).unwrap().unwrap();
        assert_eq!(routine.exercises[0].name, "Bench Press");
        assert_eq!(routine.exercises[0].rest_times, vec![90, 90, 90]);
        assert_eq!(routine.exercises[3].name, "Triceps Pushdown");
    }

    #[test]
    fn seeding_twice_is_a_no_op() {
        let db = Database::open_memory().unwrap();
        db.seed_defaults().unwrap();
        db.seed_defaults().unwrap();
        assert_eq!(db.list_routines().unwrap().len(), 2);
    }

    #[test]
    fn missing_routine_is_none() {
        let db = Database::open_memory().unwrap();
        assert!(db.routine(99).unwrap().is_none());
    }

    #[test]
    fn add_and_delete_exercise() {
        let db = Database::open_memory().unwrap();
        let rid = db.create_routine("Legs").unwrap();
        let squat = Exercise::new("Squat", vec![120, 120]).with_reps(vec!["5".into(); 3]);
        let id = db.add_exercise(rid, &squat).unwrap();
        let stored = db.exercises(rid).unwrap();
        assert_eq!(stored[0].id, Some(id));
        assert_eq!(stored[0].set_reps, vec!["5", "5", "5"]);

        db.delete_exercise(id).unwrap();
        assert!(db.exercises(rid).unwrap().is_empty());
    }

    #[test]
    fn history_round_trips_details() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let record = HistoryRecord {
            id: None,
            name: "Session complete".into(),
            set_count: 1,
            timestamp: now,
            routine_name: "Legs".into(),
            details: vec![ExerciseSummary {
                name: "Squat".into(),
                sets: 3,
                reps: vec![Some("5".into()), None, Some("4".into())],
                weights: vec![Some(100.0), None, None],
            }],
        };
        let id = db.append(&record).unwrap();
        let stored = db.history(10).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, Some(id));
        assert_eq!(stored[0].details, record.details);
        assert_eq!(db.count_since(now - Duration::days(30)).unwrap(), 1);
        assert_eq!(db.count_since(now + Duration::days(1)).unwrap(), 0);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        PreferenceStore::remove(&db, "test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restwell.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.create_routine("Upper").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.list_routines().unwrap()[0].name, "Upper");
    }
}
