//! Storage layer for the window focus log.
//!
//! Wraps the SQLite database written by the desktop focus logger and read by
//! the submission pipeline.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` can be moved between threads but not shared
//! without external synchronization. The submission pipeline is a
//! single-threaded batch job, so this never comes up in practice.
//!
//! # Schema
//!
//! A single `focus_log` table, one row per focus change:
//!
//! - `start` is stored as INTEGER epoch seconds; rows are what the logger
//!   wrote, uncorrected.
//! - `consumed` flags rows whose time has been submitted to Toggl. Absorbed
//!   rows are flagged through the surviving event's merged id list.
//! - The implicit SQLite rowid is the record id used everywhere else in the
//!   pipeline.

use std::path::Path;

use rusqlite::{Connection, params};
use thiserror::Error;

use tgl_core::{Event, RawRecord};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for the schema.
pub struct Database {
    conn: Connection,
}

/// A focus change ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub process: String,
    pub title: String,
    pub start: i64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS focus_log (
                process_name TEXT NOT NULL,
                window_title TEXT NOT NULL,
                start INTEGER NOT NULL,
                consumed INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_focus_log_start ON focus_log(start);
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of focus records in one transaction.
    pub fn insert_records(&mut self, records: &[NewRecord]) -> Result<usize, DbError> {
        if records.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO focus_log (process_name, window_title, start)
                VALUES (?, ?, ?)
                ",
            )?;
            for record in records {
                inserted += stmt.execute(params![record.process, record.title, record.start])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Fetches records within a time range, ordered by start.
    ///
    /// Both bounds are inclusive.
    pub fn events_between(&self, start: i64, end: i64) -> Result<Vec<RawRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT rowid, process_name, window_title, start, consumed
            FROM focus_log
            WHERE start >= ? AND start <= ?
            ORDER BY start ASC, rowid ASC
            ",
        )?;
        let rows = stmt.query_map([start, end], |row| {
            Ok(RawRecord {
                id: row.get(0)?,
                process: row.get(1)?,
                title: row.get(2)?,
                start: row.get(3)?,
                consumed: row.get(4)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Marks submitted events as consumed.
    ///
    /// Only events flagged `consumed` are persisted; each marks its own
    /// record plus every record in its merged id list. Returns the number of
    /// rows updated.
    pub fn consume(&mut self, events: &[Event]) -> Result<usize, DbError> {
        let mut ids: Vec<i64> = Vec::new();
        for event in events.iter().filter(|event| event.consumed) {
            ids.extend(&event.merged);
            ids.push(event.id);
        }
        if ids.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare("UPDATE focus_log SET consumed = 1 WHERE rowid = ?")?;
            for id in &ids {
                updated += stmt.execute([id])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    /// Clears the consumed flag over a time range, for reprocessing.
    ///
    /// Both bounds are inclusive. Returns the number of rows updated.
    pub fn reset_consumed(&mut self, start: i64, end: i64) -> Result<usize, DbError> {
        let updated = self.conn.execute(
            "UPDATE focus_log SET consumed = 0 WHERE start >= ? AND start <= ?",
            params![start, end],
        )?;
        Ok(updated)
    }

    /// Deletes records that started strictly before `cutoff` and reclaims
    /// file space.
    ///
    /// Unconsumed records are kept unless `include_unconsumed` is set; they
    /// may still be wanted by a future run.
    pub fn purge_before(&mut self, cutoff: i64, include_unconsumed: bool) -> Result<usize, DbError> {
        let deleted = if include_unconsumed {
            self.conn
                .execute("DELETE FROM focus_log WHERE start < ?", params![cutoff])?
        } else {
            self.conn.execute(
                "DELETE FROM focus_log WHERE start < ? AND consumed = 1",
                params![cutoff],
            )?
        };
        self.conn.execute_batch("VACUUM")?;
        Ok(deleted)
    }
}
