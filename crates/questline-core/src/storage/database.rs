//! SQLite-backed persistence for the host.
//!
//! Provides:
//! - Archive of every finished session's summary
//! - Key-value store for the live engine snapshot between CLI invocations

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError};
use crate::session::SessionSummary;

/// One row of the summary archive, without the full activity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: i64,
    pub session_id: String,
    pub session_name: String,
    pub elapsed_seconds: u64,
    pub tokens_earned: u32,
    pub completed_count: usize,
    pub activity_count: usize,
    pub completed_at: DateTime<Utc>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open `<data_dir>/questline.db`, creating and migrating it as needed.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("questline.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    pub fn open_memory() -> Result<Self, CoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CoreError> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Archive a finished session. Returns the row id.
    pub fn record_summary(&self, summary: &SessionSummary) -> Result<i64, CoreError> {
        let json = serde_json::to_string(summary)?;
        self.conn.execute(
            "INSERT INTO summaries (
                session_id, session_name, elapsed_seconds, tokens_earned,
                completed_count, activity_count, completed_at, summary_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                summary.session_id,
                summary.session_name,
                summary.elapsed_seconds,
                summary.tokens_earned,
                summary.completed_count() as i64,
                summary.activities.len() as i64,
                summary.completion_timestamp.to_rfc3339(),
                json,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, session_id = %summary.session_id, "summary archived");
        Ok(id)
    }

    /// Archived sessions, newest first.
    pub fn list_summaries(&self, limit: Option<usize>) -> Result<Vec<SummaryRecord>, CoreError> {
        let limit = limit.map_or(-1, |n| n as i64);
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, session_name, elapsed_seconds, tokens_earned,
                    completed_count, activity_count, completed_at
             FROM summaries
             ORDER BY completed_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, session_id, session_name, elapsed_seconds, tokens_earned, completed, total, at) =
                row?;
            let completed_at = DateTime::parse_from_rfc3339(&at)
                .map_err(|e| DatabaseError::QueryFailed(format!("bad completed_at '{at}': {e}")))?
                .with_timezone(&Utc);
            records.push(SummaryRecord {
                id,
                session_id,
                session_name,
                elapsed_seconds,
                tokens_earned,
                completed_count: completed.max(0) as usize,
                activity_count: total.max(0) as usize,
                completed_at,
            });
        }
        Ok(records)
    }

    /// Most recent archived summary for a session id.
    pub fn get_summary(&self, session_id: &str) -> Result<Option<SessionSummary>, CoreError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT summary_json FROM summaries
                 WHERE session_id = ?1
                 ORDER BY id DESC
                 LIMIT 1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).map_err(CoreError::from))
            .transpose()
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<bool, rusqlite::Error> {
        let removed = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}
