// ==========================================
// Site Progress - config manager
// ==========================================
// Loads schedule policy configuration from the config_kv table
// (scope_id = 'global'). Missing keys fall back to documented
// defaults so a freshly seeded database works without any tuning.
// ==========================================

use crate::config::schedule_config_trait::ScheduleConfigReader;
use crate::db::open_sqlite_connection;
use crate::engine::timeline::StageDurationPolicy;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    pub const BASE_STAGE_DURATION_DAYS: &str = "base_stage_duration_days";
    pub const MAX_PLANNED_SLIP_DAYS: &str = "max_planned_slip_days";
    pub const DURATION_JITTER_DAYS: &str = "duration_jitter_days";
    pub const ACTUAL_DATE_JITTER_DAYS: &str = "actual_date_jitter_days";
    pub const SAVE_DEBOUNCE_MS: &str = "save_debounce_ms";
}

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// Create a new ConfigManager
    ///
    /// # Arguments
    /// - db_path: database file path
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a ConfigManager over an existing shared connection
    ///
    /// Re-applies the unified PRAGMA set (idempotent) so connection
    /// behaviour stays consistent regardless of who opened it.
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| format!("failed to acquire connection lock: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// Read a config value from config_kv (scope_id = 'global')
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| format!("failed to acquire connection lock: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn get_i64_or_default(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        match self.get_config_value(key)? {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("config {} has non-integer value {:?}: {}", key, raw, e).into()),
            None => Ok(default),
        }
    }

    /// Assemble the engine's duration policy from stored config
    ///
    /// Synchronous startup path: AppState reads this once when wiring
    /// the API layer, so config_kv values reach create-fallback
    /// scheduling. Missing keys fall back to the documented defaults.
    pub fn load_duration_policy(&self, speed: f64) -> Result<StageDurationPolicy, Box<dyn Error>> {
        Ok(StageDurationPolicy {
            base_duration_days: self
                .get_i64_or_default(config_keys::BASE_STAGE_DURATION_DAYS, 14)?,
            speed,
            duration_jitter_days: self.get_i64_or_default(config_keys::DURATION_JITTER_DAYS, 3)?,
            max_slip_days: self.get_i64_or_default(config_keys::MAX_PLANNED_SLIP_DAYS, 4)?,
            actual_date_jitter_days: self
                .get_i64_or_default(config_keys::ACTUAL_DATE_JITTER_DAYS, 1)?,
        })
    }

    /// Write a global config value (insert or update)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| format!("failed to acquire connection lock: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }
}

// ==========================================
// ScheduleConfigReader implementation
// ==========================================
#[async_trait]
impl ScheduleConfigReader for ConfigManager {
    async fn get_base_stage_duration_days(&self) -> Result<i64, Box<dyn Error>> {
        self.get_i64_or_default(config_keys::BASE_STAGE_DURATION_DAYS, 14)
    }

    async fn get_max_planned_slip_days(&self) -> Result<i64, Box<dyn Error>> {
        self.get_i64_or_default(config_keys::MAX_PLANNED_SLIP_DAYS, 4)
    }

    async fn get_duration_jitter_days(&self) -> Result<i64, Box<dyn Error>> {
        self.get_i64_or_default(config_keys::DURATION_JITTER_DAYS, 3)
    }

    async fn get_actual_date_jitter_days(&self) -> Result<i64, Box<dyn Error>> {
        self.get_i64_or_default(config_keys::ACTUAL_DATE_JITTER_DAYS, 1)
    }

    async fn get_save_debounce_ms(&self) -> Result<u64, Box<dyn Error>> {
        let v = self.get_i64_or_default(config_keys::SAVE_DEBOUNCE_MS, 2000)?;
        if v < 0 {
            return Err(format!("{} must be non-negative, got {}", config_keys::SAVE_DEBOUNCE_MS, v).into());
        }
        Ok(v as u64)
    }
}
