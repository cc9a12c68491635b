//! SQLite-based session history and the current-session slot.
//!
//! Provides persistent storage for:
//! - Focus session history records and their reflections
//! - Key-value store holding the in-flight session snapshot and the idle
//!   cycle position

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::data_dir;
use super::migrations;
use crate::error::{DatabaseError, Result};
use crate::session::{HistoryRecord, Reflection, SessionRecorder, SessionReport};
use crate::timer::{CyclePosition, Phase, SessionSnapshot, SnapshotStore};

const CURRENT_SESSION_KEY: &str = "current_session";
const CYCLE_POSITION_KEY: &str = "cycle_position";

const RECORD_COLUMNS: &str = "id, date, start_time, end_time, phase_durations, intention, \
                              distractions, reflection, completed";

/// SQLite database for session history.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish()
    }
}

struct RawRecord {
    id: String,
    date: String,
    start_time: String,
    end_time: String,
    phase_durations: String,
    intention: String,
    distractions: String,
    reflection: Option<String>,
    completed: bool,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            phase_durations: row.get(4)?,
            intention: row.get(5)?,
            distractions: row.get(6)?,
            reflection: row.get(7)?,
            completed: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<HistoryRecord> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            DatabaseError::QueryFailed(format!("record {}: bad {field}: {e}", self.id))
        };
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|e| corrupt("date", &e))?;
        let start_time = parse_time(&self.start_time).map_err(|e| corrupt("start_time", &e))?;
        let end_time = parse_time(&self.end_time).map_err(|e| corrupt("end_time", &e))?;
        let reflection = self
            .reflection
            .as_deref()
            .map(|raw| serde_json::from_str::<Reflection>(raw))
            .transpose()?;
        Ok(HistoryRecord {
            date,
            start_time,
            end_time,
            phase_durations: serde_json::from_str(&self.phase_durations)?,
            distractions: serde_json::from_str(&self.distractions)?,
            reflection,
            completed: self.completed,
            intention: self.intention,
            id: self.id,
        })
    }
}

fn parse_time(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|t| t.with_timezone(&Utc))
}

impl Database {
    /// Open the database at `~/.config/focustrainer/focustrainer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("focustrainer.db"))
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Insert a history record.
    ///
    /// # Errors
    /// Returns an error if serialization or the insert fails.
    pub fn insert_record(&self, record: &HistoryRecord) -> Result<()> {
        let reflection = record
            .reflection
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO sessions (id, date, start_time, end_time, phase_durations, intention,
                                   distractions, reflection, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.date.format("%Y-%m-%d").to_string(),
                record.start_time.to_rfc3339(),
                record.end_time.to_rfc3339(),
                serde_json::to_string(&record.phase_durations)?,
                record.intention,
                serde_json::to_string(&record.distractions)?,
                reflection,
                record.completed,
            ],
        )?;
        Ok(())
    }

    /// Attach a reflection to a record that has none yet.
    ///
    /// Returns `false` if the id is unknown or a reflection already exists.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn set_reflection(&self, id: &str, reflection: &Reflection) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE sessions SET reflection = ?2 WHERE id = ?1 AND reflection IS NULL",
            params![id, serde_json::to_string(reflection)?],
        )?;
        Ok(changed == 1)
    }

    /// Most recent records first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored row is corrupt.
    pub fn list_records(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM sessions ORDER BY seq DESC LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], RawRecord::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    /// Records whose date falls on `date` (UTC), oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored row is corrupt.
    pub fn records_on(&self, date: NaiveDate) -> Result<Vec<HistoryRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM sessions WHERE date = ?1 ORDER BY seq"
        ))?;
        let rows = stmt.query_map(
            params![date.format("%Y-%m-%d").to_string()],
            RawRecord::from_row,
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    /// # Errors
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get_record(&self, id: &str) -> Result<Option<HistoryRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                RawRecord::from_row,
            )
            .optional()?;
        raw.map(RawRecord::into_record).transpose()
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

    /// Remove a key from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl SessionRecorder for Database {
    fn record(&mut self, report: &SessionReport) -> Option<String> {
        if report.phase != Phase::Focus {
            return None;
        }
        let record = HistoryRecord::from_report(report);
        match self.insert_record(&record) {
            Ok(()) => {
                tracing::debug!(id = %record.id, completed = record.completed, "session recorded");
                Some(record.id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to record session");
                None
            }
        }
    }

    fn attach_reflection(&mut self, id: &str, reflection: Reflection) -> bool {
        self.set_reflection(id, &reflection).unwrap_or_else(|e| {
            tracing::warn!(error = %e, id, "failed to attach reflection");
            false
        })
    }

    fn list(&self, limit: usize) -> Vec<HistoryRecord> {
        self.list_records(limit).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to list sessions");
            Vec::new()
        })
    }

    fn get(&self, id: &str) -> Option<HistoryRecord> {
        self.get_record(id).unwrap_or_else(|e| {
            tracing::warn!(error = %e, id, "failed to read session");
            None
        })
    }
}

/// [`SnapshotStore`] backed by the `kv` table.
#[derive(Debug)]
pub struct SqliteSnapshotStore {
    db: Database,
}

impl SqliteSnapshotStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open a dedicated connection to the default database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open() -> Result<Self> {
        Ok(Self::new(Database::open()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn read(&self, key: &str) -> Option<String> {
        self.db.kv_get(key).unwrap_or_else(|e| {
            tracing::warn!(error = %e, key, "failed to read stored state");
            None
        })
    }

    fn write(&self, key: &str, value: Option<String>) {
        let result = match value {
            Some(value) => self.db.kv_set(key, &value),
            None => self.db.kv_delete(key),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, key, "failed to write stored state");
        }
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn get(&self) -> Option<SessionSnapshot> {
        SessionSnapshot::decode(&self.read(CURRENT_SESSION_KEY)?)
    }

    fn put(&mut self, snapshot: Option<&SessionSnapshot>) {
        let encoded = match snapshot.map(SessionSnapshot::encode).transpose() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode session snapshot");
                return;
            }
        };
        self.write(CURRENT_SESSION_KEY, encoded);
    }

    fn get_cycle(&self) -> Option<CyclePosition> {
        let raw = self.read(CYCLE_POSITION_KEY)?;
        serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(error = %e, "ignoring malformed cycle position"))
            .ok()
    }

    fn put_cycle(&mut self, position: &CyclePosition) {
        match serde_json::to_string(position) {
            Ok(raw) => self.write(CYCLE_POSITION_KEY, Some(raw)),
            Err(e) => tracing::warn!(error = %e, "failed to encode cycle position"),
        }
    }
}
