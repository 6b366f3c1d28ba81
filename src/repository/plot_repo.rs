// ==========================================
// Site Progress - plot repository
// ==========================================

use crate::domain::plot::Plot;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct PlotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlotRepository {
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
            CREATE TABLE IF NOT EXISTS plot (
              plot_id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              construction_type_id TEXT NOT NULL REFERENCES construction_type(type_id),
              start_date TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_plot_type ON plot(construction_type_id);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Plot> {
        Ok(Plot {
            plot_id: row.get(0)?,
            name: row.get(1)?,
            construction_type_id: row.get(2)?,
            start_date: row.get(3)?,
        })
    }

    pub fn list_plots(&self) -> RepositoryResult<Vec<Plot>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT plot_id, name, construction_type_id, start_date FROM plot ORDER BY name ASC",
        )?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_by_id(&self, plot_id: &str) -> RepositoryResult<Option<Plot>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT plot_id, name, construction_type_id, start_date FROM plot WHERE plot_id = ?1",
            params![plot_id],
            Self::map_row,
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn insert(&self, plot: &Plot) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO plot (plot_id, name, construction_type_id, start_date)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![plot.plot_id, plot.name, plot.construction_type_id, plot.start_date],
        )?;
        Ok(())
    }
}
