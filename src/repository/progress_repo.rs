// ==========================================
// Site Progress - construction progress repository
// ==========================================
// construction_progress: one live record per (plot, stage) - enforced
// by a UNIQUE constraint. construction_plan_history: append-only,
// gapless version numbers, UNIQUE (progress_id, version_number),
// deleted only by cascade or atomic replace.
//
// Atomicity contract:
// - apply_revision: live-record update + history insert in one
//   transaction; a failure leaves neither applied
// - replace_history: delete-all + insert-all + live-record sync in one
//   transaction; no observable empty-history window
// ==========================================

use crate::domain::progress::{ConstructionPlanHistory, ConstructionProgress};
use crate::engine::revision::PlanRevision;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct ConstructionProgressRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ConstructionProgressRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_tables()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        let repo = Self { conn };
        let _ = repo.ensure_tables();
        repo
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_tables(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS construction_progress (
              progress_id TEXT PRIMARY KEY,
              plot_id TEXT NOT NULL REFERENCES plot(plot_id) ON DELETE CASCADE,
              stage_id TEXT NOT NULL REFERENCES construction_stage(stage_id),
              programme_start_date TEXT NOT NULL,
              programme_end_date TEXT NOT NULL,
              planned_start_date TEXT NOT NULL,
              planned_end_date TEXT NOT NULL,
              actual_start_date TEXT,
              actual_end_date TEXT,
              completion_percentage INTEGER NOT NULL DEFAULT 0
                CHECK (completion_percentage BETWEEN 0 AND 100),
              current_plan_version INTEGER NOT NULL DEFAULT 1,
              updated_at TEXT NOT NULL,
              UNIQUE (plot_id, stage_id)
            );

            CREATE INDEX IF NOT EXISTS idx_construction_progress_plot
              ON construction_progress(plot_id);

            CREATE TABLE IF NOT EXISTS construction_plan_history (
              history_id TEXT PRIMARY KEY,
              progress_id TEXT NOT NULL REFERENCES construction_progress(progress_id) ON DELETE CASCADE,
              version_number INTEGER NOT NULL,
              planned_start_date TEXT NOT NULL,
              planned_end_date TEXT NOT NULL,
              reason TEXT NOT NULL,
              changed_by TEXT NOT NULL,
              created_at TEXT NOT NULL,
              UNIQUE (progress_id, version_number)
            );

            CREATE INDEX IF NOT EXISTS idx_construction_plan_history_progress
              ON construction_plan_history(progress_id, version_number);
            "#,
        )?;
        Ok(())
    }

    // ==========================================
    // Row mapping
    // ==========================================

    fn map_progress_row(row: &Row<'_>) -> rusqlite::Result<ConstructionProgress> {
        Ok(ConstructionProgress {
            progress_id: row.get(0)?,
            plot_id: row.get(1)?,
            stage_id: row.get(2)?,
            programme_start_date: row.get(3)?,
            programme_end_date: row.get(4)?,
            planned_start_date: row.get(5)?,
            planned_end_date: row.get(6)?,
            actual_start_date: row.get(7)?,
            actual_end_date: row.get(8)?,
            completion_percentage: row.get(9)?,
            current_plan_version: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn map_history_row(row: &Row<'_>) -> rusqlite::Result<ConstructionPlanHistory> {
        Ok(ConstructionPlanHistory {
            history_id: row.get(0)?,
            progress_id: row.get(1)?,
            version_number: row.get(2)?,
            planned_start_date: row.get(3)?,
            planned_end_date: row.get(4)?,
            reason: row.get(5)?,
            changed_by: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    const PROGRESS_COLUMNS: &'static str = r#"
        progress_id, plot_id, stage_id,
        programme_start_date, programme_end_date,
        planned_start_date, planned_end_date,
        actual_start_date, actual_end_date,
        completion_percentage, current_plan_version, updated_at
    "#;

    const HISTORY_COLUMNS: &'static str = r#"
        history_id, progress_id, version_number,
        planned_start_date, planned_end_date,
        reason, changed_by, created_at
    "#;

    // ==========================================
    // Queries
    // ==========================================

    pub fn find_by_id(&self, progress_id: &str) -> RepositoryResult<Option<ConstructionProgress>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM construction_progress WHERE progress_id = ?1",
            Self::PROGRESS_COLUMNS
        );
        let result = conn.query_row(&sql, params![progress_id], Self::map_progress_row);
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_by_plot_and_stage(
        &self,
        plot_id: &str,
        stage_id: &str,
    ) -> RepositoryResult<Option<ConstructionProgress>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM construction_progress WHERE plot_id = ?1 AND stage_id = ?2",
            Self::PROGRESS_COLUMNS
        );
        let result = conn.query_row(&sql, params![plot_id, stage_id], Self::map_progress_row);
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_by_plot(&self, plot_id: &str) -> RepositoryResult<Vec<ConstructionProgress>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM construction_progress WHERE plot_id = ?1 ORDER BY stage_id ASC",
            Self::PROGRESS_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![plot_id], Self::map_progress_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// History for a progress record, ordered by version_number
    pub fn list_history(&self, progress_id: &str) -> RepositoryResult<Vec<ConstructionPlanHistory>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM construction_plan_history WHERE progress_id = ?1 ORDER BY version_number ASC",
            Self::HISTORY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![progress_id], Self::map_history_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Create a progress record together with its initial history run
    ///
    /// One transaction: the live record never exists without at least
    /// the version-1 "Initial plan" entry.
    pub fn insert_with_history(
        &self,
        progress: &ConstructionProgress,
        history: &[ConstructionPlanHistory],
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Self::insert_progress_tx(&tx, progress)?;
        for entry in history {
            Self::insert_history_tx(&tx, entry)?;
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// Update observed progress on the live record (completion
    /// percentage and actual dates); planned dates are only touched by
    /// apply_revision
    pub fn update_observed_progress(&self, progress: &ConstructionProgress) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE construction_progress SET
                actual_start_date = ?2,
                actual_end_date = ?3,
                completion_percentage = ?4,
                updated_at = ?5
            WHERE progress_id = ?1
            "#,
            params![
                progress.progress_id,
                progress.actual_start_date,
                progress.actual_end_date,
                progress.completion_percentage,
                progress.updated_at,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ConstructionProgress".to_string(),
                id: progress.progress_id.clone(),
            });
        }
        Ok(())
    }

    /// Apply a plan revision atomically
    ///
    /// Updates the live record's planned dates and version count and
    /// inserts the matching history row in one transaction. The update
    /// is guarded on the expected prior version; a concurrent revision
    /// surfaces as VersionConflict instead of a silent double-apply.
    pub fn apply_revision(&self, revision: &PlanRevision) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let expected_prior = revision.progress.current_plan_version - 1;
        let affected = tx.execute(
            r#"
            UPDATE construction_progress SET
                planned_start_date = ?2,
                planned_end_date = ?3,
                current_plan_version = ?4,
                updated_at = ?5
            WHERE progress_id = ?1 AND current_plan_version = ?6
            "#,
            params![
                revision.progress.progress_id,
                revision.progress.planned_start_date,
                revision.progress.planned_end_date,
                revision.progress.current_plan_version,
                revision.progress.updated_at,
                expected_prior,
            ],
        )?;
        if affected == 0 {
            // Distinguish a missing record from a stale version
            let exists: bool = tx
                .query_row(
                    "SELECT 1 FROM construction_progress WHERE progress_id = ?1",
                    params![revision.progress.progress_id],
                    |_row| Ok(true),
                )
                .unwrap_or(false);
            return Err(if exists {
                RepositoryError::VersionConflict {
                    message: format!(
                        "progress {} is no longer at plan version {}",
                        revision.progress.progress_id, expected_prior
                    ),
                }
            } else {
                RepositoryError::NotFound {
                    entity: "ConstructionProgress".to_string(),
                    id: revision.progress.progress_id.clone(),
                }
            });
        }

        Self::insert_history_tx(&tx, &revision.history_entry)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// Replace a record's entire plan history atomically
    ///
    /// Seeding/demo tooling only. Deletes every history row, inserts
    /// the new run and syncs the live record's planned dates and
    /// version count to the final entry, all in one transaction.
    pub fn replace_history(
        &self,
        progress_id: &str,
        entries: &[ConstructionPlanHistory],
    ) -> RepositoryResult<()> {
        let last = entries.last().ok_or_else(|| {
            RepositoryError::ValidationError("replacement history must not be empty".to_string())
        })?;

        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            "DELETE FROM construction_plan_history WHERE progress_id = ?1",
            params![progress_id],
        )?;
        for entry in entries {
            Self::insert_history_tx(&tx, entry)?;
        }

        let affected = tx.execute(
            r#"
            UPDATE construction_progress SET
                planned_start_date = ?2,
                planned_end_date = ?3,
                current_plan_version = ?4
            WHERE progress_id = ?1
            "#,
            params![
                progress_id,
                last.planned_start_date,
                last.planned_end_date,
                last.version_number,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ConstructionProgress".to_string(),
                id: progress_id.to_string(),
            });
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// Delete a progress record; its history goes with it (cascade)
    pub fn delete_by_plot_and_stage(&self, plot_id: &str, stage_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM construction_progress WHERE plot_id = ?1 AND stage_id = ?2",
            params![plot_id, stage_id],
        )?;
        Ok(affected)
    }

    // ==========================================
    // Transaction helpers
    // ==========================================

    fn insert_progress_tx(
        tx: &rusqlite::Transaction<'_>,
        progress: &ConstructionProgress,
    ) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO construction_progress (
                progress_id, plot_id, stage_id,
                programme_start_date, programme_end_date,
                planned_start_date, planned_end_date,
                actual_start_date, actual_end_date,
                completion_percentage, current_plan_version, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                progress.progress_id,
                progress.plot_id,
                progress.stage_id,
                progress.programme_start_date,
                progress.programme_end_date,
                progress.planned_start_date,
                progress.planned_end_date,
                progress.actual_start_date,
                progress.actual_end_date,
                progress.completion_percentage,
                progress.current_plan_version,
                progress.updated_at,
            ],
        )?;
        Ok(())
    }

    fn insert_history_tx(
        tx: &rusqlite::Transaction<'_>,
        entry: &ConstructionPlanHistory,
    ) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO construction_plan_history (
                history_id, progress_id, version_number,
                planned_start_date, planned_end_date,
                reason, changed_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                entry.history_id,
                entry.progress_id,
                entry.version_number,
                entry.planned_start_date,
                entry.planned_end_date,
                entry.reason,
                entry.changed_by,
                entry.created_at,
            ],
        )?;
        Ok(())
    }
}
