//! SQLite-backed run registry.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::recorder::{MetricValue, Run, RunRecorder};
use crate::types::{SCORE_COLUMN, ScoredRow};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS runs (
    run_id       TEXT PRIMARY KEY,
    created_at   TEXT NOT NULL,
    config_json  TEXT NOT NULL,
    git_revision TEXT,
    notes        TEXT
);
CREATE TABLE IF NOT EXISTS metrics (
    run_id    TEXT NOT NULL REFERENCES runs(run_id),
    record_id TEXT NOT NULL,
    variant   TEXT NOT NULL,
    metric    TEXT NOT NULL,
    value     REAL
);
CREATE INDEX IF NOT EXISTS idx_metrics_run ON metrics(run_id);
";

type RunRow = (String, String, String, Option<String>, Option<String>);

/// Run recorder persisting to a SQLite file.
pub struct SqliteRunStore {
    conn: Connection,
}

impl SqliteRunStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
                    message: format!("Failed to create {}: {e}", parent.display()),
                })?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        info!(path = %path.display(), "Opened run store");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn run_exists(&self, run_id: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn ensure_run(&self, run_id: &str) -> Result<(), StoreError> {
        if self.run_exists(run_id)? {
            Ok(())
        } else {
            Err(StoreError::RunNotFound {
                run_id: run_id.to_string(),
            })
        }
    }
}

fn to_run(row: RunRow) -> Result<Run, StoreError> {
    let (run_id, created_at, config_json, git_revision, notes) = row;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| StoreError::Corrupt {
            message: format!("run {run_id}: bad timestamp '{created_at}': {e}"),
        })?
        .with_timezone(&Utc);
    Ok(Run {
        run_id,
        created_at,
        config_json,
        git_revision,
        notes,
    })
}

fn read_run_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

impl RunRecorder for SqliteRunStore {
    fn create_run(
        &mut self,
        config: &serde_json::Value,
        notes: Option<&str>,
    ) -> Result<Run, StoreError> {
        let run = Run::new(config, notes);
        self.conn.execute(
            "INSERT INTO runs (run_id, created_at, config_json, git_revision, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &run.run_id,
                run.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                &run.config_json,
                &run.git_revision,
                &run.notes,
            ],
        )?;
        info!(run_id = %run.run_id, "Created run");
        Ok(run)
    }

    fn log_metric(
        &mut self,
        run_id: &str,
        record_id: &str,
        variant: &str,
        metric: &str,
        value: f64,
    ) -> Result<(), StoreError> {
        self.ensure_run(run_id)?;
        self.conn.execute(
            "INSERT INTO metrics (run_id, record_id, variant, metric, value)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, record_id, variant, metric, value],
        )?;
        Ok(())
    }

    fn list_runs(&self) -> Result<Vec<Run>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, created_at, config_json, git_revision, notes
             FROM runs ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map([], read_run_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(to_run).collect()
    }

    fn get_run(&self, run_id: &str) -> Result<Option<Run>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT run_id, created_at, config_json, git_revision, notes
                 FROM runs WHERE run_id = ?1",
                params![run_id],
                read_run_row,
            )
            .optional()?;
        row.map(to_run).transpose()
    }

    fn metric_values(&self, run_id: &str) -> Result<Vec<MetricValue>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT record_id, variant, metric, value
             FROM metrics WHERE run_id = ?1 ORDER BY rowid",
        )?;
        let values = stmt
            .query_map(params![run_id], |row| {
                Ok(MetricValue {
                    record_id: row.get(0)?,
                    variant: row.get(1)?,
                    metric: row.get(2)?,
                    // NaN is stored as NULL by SQLite.
                    value: row.get::<_, Option<f64>>(3)?.unwrap_or(f64::NAN),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values)
    }

    /// Log every row inside a single transaction.
    fn log_rows(&mut self, run_id: &str, rows: &[ScoredRow]) -> Result<usize, StoreError> {
        self.ensure_run(run_id)?;
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO metrics (run_id, record_id, variant, metric, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in rows {
                stmt.execute(params![run_id, &row.id, &row.variant, SCORE_COLUMN, row.score])?;
                written += 1;
                for (metric, value) in &row.metrics {
                    stmt.execute(params![run_id, &row.id, &row.variant, metric, value])?;
                    written += 1;
                }
            }
        }
        tx.commit()?;
        debug!(run_id, values = written, "Logged scored rows");
        Ok(written)
    }
}
