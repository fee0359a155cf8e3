//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! Pipeline stages and the scorer call store methods — they never
//! execute SQL directly.

use crate::error::{PipelineError, PipelineResult};
use crate::gbdt::Gbdt;
use crate::trainer::EvalMetrics;
use crate::types::RunId;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

/// Logical artifact names. Serving loads exactly these two keys.
pub const KEY_CLASSIFIER: &str = "classifier";
pub const KEY_REGRESSOR: &str = "regressor";

pub struct ModelStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl ModelStore {
    /// Open (or create) the model database at `path`.
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: readers stay unblocked while a training run writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database
    /// (isolated). For file-based databases, this opens the same file.
    pub fn reopen(&self) -> PipelineResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_training_metrics.sql"))?;
        Ok(())
    }

    // ── Run ledger ─────────────────────────────────────────────

    pub fn insert_run(
        &self,
        run_id: &str,
        seed: u64,
        version: &str,
        source_path: &str,
        cutoff: NaiveDateTime,
        horizon_days: i64,
    ) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, source_path, cutoff, horizon_days, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                seed as i64,
                version,
                source_path,
                cutoff.format("%Y-%m-%d %H:%M:%S").to_string(),
                horizon_days,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ── Model artifacts ────────────────────────────────────────

    /// Upsert a serialized model under its logical key. A re-run
    /// replaces the previous artifact in place.
    pub fn save_model(&self, key: &str, model: &Gbdt, run_id: &str) -> PipelineResult<()> {
        let payload = serde_json::to_string(model)?;
        self.conn.execute(
            "INSERT INTO model_artifact (key, run_id, payload, saved_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                run_id   = excluded.run_id,
                payload  = excluded.payload,
                saved_at = excluded.saved_at",
            params![key, run_id, payload, chrono::Utc::now().to_rfc3339()],
        )?;
        log::debug!("store: saved artifact '{key}' for run {run_id}");
        Ok(())
    }

    /// Load the model stored under `key`, failing when nothing was
    /// ever saved there.
    pub fn load_model(&self, key: &str) -> PipelineResult<Gbdt> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM model_artifact WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(PipelineError::ModelArtifactMissing {
                key: key.to_string(),
            }),
        }
    }

    // ── Metrics ────────────────────────────────────────────────

    pub fn record_metrics(&self, run_id: &str, metrics: &EvalMetrics) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO training_metrics (
                run_id, train_rows, test_rows, train_converters,
                test_converters, accuracy, mae_days
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(run_id) DO UPDATE SET
                accuracy = excluded.accuracy,
                mae_days = excluded.mae_days",
            params![
                run_id,
                metrics.train_rows as i64,
                metrics.test_rows as i64,
                metrics.train_converters as i64,
                metrics.test_converters as i64,
                metrics.accuracy,
                metrics.mae_days,
            ],
        )?;
        Ok(())
    }

    /// Metrics of the most recently started run, if any run completed.
    pub fn latest_metrics(&self) -> PipelineResult<Option<(RunId, EvalMetrics)>> {
        let row = self
            .conn
            .query_row(
                "SELECT m.run_id, m.train_rows, m.test_rows, m.train_converters,
                        m.test_converters, m.accuracy, m.mae_days
                 FROM training_metrics m
                 JOIN run r ON r.run_id = m.run_id
                 ORDER BY r.started_at DESC
                 LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        EvalMetrics {
                            train_rows:       row.get::<_, i64>(1)? as usize,
                            test_rows:        row.get::<_, i64>(2)? as usize,
                            train_converters: row.get::<_, i64>(3)? as usize,
                            test_converters:  row.get::<_, i64>(4)? as usize,
                            accuracy:         row.get(5)?,
                            mae_days:         row.get(6)?,
                        },
                    ))
                },
            )
            .optional()?;
        Ok(row)
    }
}
