//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Engines never see a connection; the pipeline loads inputs through the
//! store and hands plain tables to the engines.

use crate::{
    error::{AnalysisError, AnalysisResult},
    types::RunId,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

mod rfm;
mod transactions;

pub const SALES_DATASET: &str = "sales";
pub const RETURNS_DATASET: &str = "returns";
pub const CALENDAR_DATASET: &str = "calendar";

pub struct AnalysisStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl AnalysisStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> AnalysisResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open a database that an earlier ingest must already have created.
    pub fn open_existing(path: &str) -> AnalysisResult<Self> {
        if !Path::new(path).exists() {
            return Err(AnalysisError::MissingInput {
                location: path.to_string(),
            });
        }
        Self::open(path)
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AnalysisResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    pub fn location(&self) -> &str {
        self.path.as_deref().unwrap_or(":memory:")
    }

    fn dataset_location(&self, dataset: &str) -> String {
        format!("{}#{dataset}", self.location())
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AnalysisResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_transactions.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_rfm.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_calendar.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, snapshot_date: NaiveDate, version: &str) -> AnalysisResult<()> {
        insert_run_row(&self.conn, run_id, snapshot_date, version)?;
        Ok(())
    }

    /// The most recently inserted run, if any.
    pub fn latest_run_id(&self) -> AnalysisResult<Option<RunId>> {
        self.conn
            .query_row(
                "SELECT run_id FROM run ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn run_snapshot_date(&self, run_id: &str) -> AnalysisResult<Option<NaiveDate>> {
        self.conn
            .query_row(
                "SELECT snapshot_date FROM run WHERE run_id = ?1",
                params![run_id],
                |row| date_column(row, 0),
            )
            .optional()
            .map_err(Into::into)
    }

    // ── Dataset registry ──────────────────────────────────────

    fn register_dataset(&self, name: &str, row_count: usize) -> AnalysisResult<()> {
        self.conn.execute(
            "INSERT INTO dataset (name, row_count, ingested_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                row_count = excluded.row_count,
                ingested_at = excluded.ingested_at",
            params![name, row_count as i64, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Row count recorded at ingest, or `None` if the dataset was never published.
    pub fn dataset_row_count(&self, name: &str) -> AnalysisResult<Option<i64>> {
        self.conn
            .query_row(
                "SELECT row_count FROM dataset WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }
}

fn insert_run_row(
    conn: &Connection,
    run_id: &str,
    snapshot_date: NaiveDate,
    version: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO run (run_id, snapshot_date, version, started_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            run_id,
            snapshot_date.to_string(),
            version,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Read a `YYYY-MM-DD` text column.
fn date_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    raw.parse::<NaiveDate>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
