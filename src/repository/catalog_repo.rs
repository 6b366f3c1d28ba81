// ==========================================
// Site Progress - construction catalog repository
// ==========================================
// construction_type / construction_stage: immutable reference data.
// Stage lists always come back sorted by sort_order.
// ==========================================

use crate::domain::catalog::{ConstructionStage, ConstructionType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
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
            CREATE TABLE IF NOT EXISTS construction_type (
              type_id TEXT PRIMARY KEY,
              name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS construction_stage (
              stage_id TEXT PRIMARY KEY,
              construction_type_id TEXT NOT NULL REFERENCES construction_type(type_id) ON DELETE CASCADE,
              name TEXT NOT NULL,
              sort_order INTEGER NOT NULL,
              color TEXT NOT NULL DEFAULT '#888888',
              UNIQUE (construction_type_id, sort_order)
            );

            CREATE INDEX IF NOT EXISTS idx_construction_stage_type
              ON construction_stage(construction_type_id, sort_order);
            "#,
        )?;
        Ok(())
    }

    fn map_stage_row(row: &Row<'_>) -> rusqlite::Result<ConstructionStage> {
        Ok(ConstructionStage {
            stage_id: row.get(0)?,
            construction_type_id: row.get(1)?,
            name: row.get(2)?,
            sort_order: row.get(3)?,
            color: row.get(4)?,
        })
    }

    pub fn list_construction_types(&self) -> RepositoryResult<Vec<ConstructionType>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT type_id, name FROM construction_type ORDER BY name ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ConstructionType {
                    type_id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_construction_type(&self, type_id: &str) -> RepositoryResult<Option<ConstructionType>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT type_id, name FROM construction_type WHERE type_id = ?1",
            params![type_id],
            |row| {
                Ok(ConstructionType {
                    type_id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Ordered stage list for a construction type (build order)
    pub fn list_stages(&self, construction_type_id: &str) -> RepositoryResult<Vec<ConstructionStage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT stage_id, construction_type_id, name, sort_order, color
            FROM construction_stage
            WHERE construction_type_id = ?1
            ORDER BY sort_order ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![construction_type_id], Self::map_stage_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_stage(&self, stage_id: &str) -> RepositoryResult<Option<ConstructionStage>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT stage_id, construction_type_id, name, sort_order, color
            FROM construction_stage
            WHERE stage_id = ?1
            "#,
            params![stage_id],
            Self::map_stage_row,
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn insert_construction_type(&self, entity: &ConstructionType) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO construction_type (type_id, name) VALUES (?1, ?2)",
            params![entity.type_id, entity.name],
        )?;
        Ok(())
    }

    pub fn insert_stage(&self, entity: &ConstructionStage) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO construction_stage (stage_id, construction_type_id, name, sort_order, color)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                entity.stage_id,
                entity.construction_type_id,
                entity.name,
                entity.sort_order,
                entity.color,
            ],
        )?;
        Ok(())
    }
}
