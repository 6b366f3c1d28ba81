// ==========================================
// Site Progress - main entry
// ==========================================
// Initializes logging and application state and reports a startup
// summary. The UI (map viewer / plot dialog) runs out of process and
// talks to the API layer; this binary is the backend bootstrap.
// ==========================================

use site_progress::app::{get_default_db_path, AppState};
use site_progress::config::ScheduleConfigReader;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    site_progress::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - construction stage tracking", site_progress::APP_NAME);
    tracing::info!("version: {}", site_progress::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("using database: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| format!("AppState init failed: {}", e))?;

    // Warn (loudly, once) when running against an unexpected schema
    {
        let conn = site_progress::db::open_sqlite_connection(&state.db_path)?;
        match site_progress::db::read_schema_version(&conn)? {
            Some(v) if v == site_progress::db::CURRENT_SCHEMA_VERSION => {
                tracing::info!("schema version: {}", v);
            }
            Some(v) => {
                tracing::warn!(
                    "schema version {} differs from expected {} - run the seeder or migrate",
                    v,
                    site_progress::db::CURRENT_SCHEMA_VERSION
                );
            }
            None => {
                tracing::warn!("no schema_version table - database not yet seeded");
            }
        }
    }

    let policy = state
        .config
        .get_duration_policy(1.0)
        .await
        .map_err(|e| format!("failed to load duration policy: {}", e))?;
    tracing::info!(
        "duration policy: base={}d slip<= {}d jitter +/-{}d",
        policy.base_duration_days,
        policy.max_slip_days,
        policy.duration_jitter_days
    );

    let plots = state.plot_repo.list_plots()?;
    tracing::info!("plots on file: {}", plots.len());
    let types = state.catalog_api.list_construction_types()?;
    tracing::info!("construction types: {}", types.len());

    Ok(())
}
