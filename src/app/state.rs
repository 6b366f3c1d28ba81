// ==========================================
// Site Progress - application state
// ==========================================
// Wires repositories and API instances over one shared connection.
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{CatalogApi, ProgressApi};
use crate::config::config_manager::ConfigManager;
use crate::engine::timeline::StageDurationPolicy;
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::plot_repo::PlotRepository;
use crate::repository::progress_repo::ConstructionProgressRepository;

/// Application state
///
/// Holds every API instance and shared resource for the backend.
pub struct AppState {
    /// Database path
    pub db_path: String,

    /// Progress API
    pub progress_api: Arc<ProgressApi>,

    /// Catalog API
    pub catalog_api: Arc<CatalogApi>,

    /// Progress repository (seeding tooling goes straight to it)
    pub progress_repo: Arc<ConstructionProgressRepository>,

    /// Plot repository
    pub plot_repo: Arc<PlotRepository>,

    /// Catalog repository
    pub catalog_repo: Arc<CatalogRepository>,

    /// Config manager
    pub config: Arc<ConfigManager>,
}

impl AppState {
    /// Create a new AppState
    ///
    /// Initializes all repositories (self-migrating their tables) and
    /// API instances over a single shared connection.
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("initializing AppState, database: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("failed to open database: {}", e))?;

        // Best-effort: config tables are also created by the dev
        // schema; make sure they exist before ConfigManager reads.
        if let Err(e) = ensure_config_tables(&conn) {
            tracing::warn!("config table init failed (continuing startup): {}", e);
        }

        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // Repository layer
        // ==========================================
        // Catalog and plot first: progress references both.
        let catalog_repo = Arc::new(CatalogRepository::from_connection(conn.clone()));
        let plot_repo = Arc::new(PlotRepository::from_connection(conn.clone()));
        let progress_repo = Arc::new(ConstructionProgressRepository::from_connection(conn.clone()));

        let config = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("failed to create ConfigManager: {}", e))?,
        );

        // ==========================================
        // API layer
        // ==========================================
        // The duration policy comes from config_kv so that tuned
        // values (base_stage_duration_days etc.) reach create-fallback
        // scheduling; defaults only cover an unreadable config.
        let default_policy = match config.load_duration_policy(1.0) {
            Ok(policy) => policy,
            Err(e) => {
                tracing::warn!("failed to load duration policy from config (using defaults): {}", e);
                StageDurationPolicy::default()
            }
        };

        let progress_api = Arc::new(ProgressApi::new(
            progress_repo.clone(),
            plot_repo.clone(),
            catalog_repo.clone(),
            default_policy,
        ));
        let catalog_api = Arc::new(CatalogApi::new(catalog_repo.clone()));

        tracing::info!("AppState initialized");

        Ok(Self {
            db_path,
            progress_api,
            catalog_api,
            progress_repo,
            plot_repo,
            catalog_repo,
            config,
        })
    }
}

fn ensure_config_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config_scope (
          scope_id TEXT PRIMARY KEY,
          scope_type TEXT NOT NULL,
          scope_key TEXT NOT NULL,
          created_at TEXT NOT NULL DEFAULT (datetime('now')),
          UNIQUE (scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
          scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
          key TEXT NOT NULL,
          value TEXT NOT NULL,
          updated_at TEXT NOT NULL DEFAULT (datetime('now')),
          PRIMARY KEY (scope_id, key)
        );
        "#,
    )
}

/// Default database location under the user data directory
pub fn get_default_db_path() -> String {
    let base = dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
    let dir = base.join("site-progress");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!("failed to create data dir {:?} (using cwd): {}", dir, e);
        return "site-progress.db".to_string();
    }
    dir.join("site-progress.db").to_string_lossy().to_string()
}
