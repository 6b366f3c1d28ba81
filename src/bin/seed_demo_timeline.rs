// ==========================================
// Site Progress - demo database seeder
// ==========================================
// Resets the database (after a timestamped backup), applies the dev
// schema and fills it with a spread of plots covering every build
// profile, so the map and plot dialog have realistic data right after
// seeding. Deterministic for a given seed argument.
// ==========================================

use chrono::{Duration, Local};
use rusqlite::{params, Connection};
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use site_progress::app::get_default_db_path;
use site_progress::config::config_manager::config_keys;
use site_progress::db::{open_sqlite_connection, CURRENT_SCHEMA_VERSION};
use site_progress::domain::plot::Plot;
use site_progress::domain::progress::ConstructionProgress;
use site_progress::domain::types::PlotProfileKind;
use site_progress::engine::jitter::{JitterPolicy, SeededJitter};
use site_progress::engine::revision::PlanRevisionEngine;
use site_progress::engine::timeline::{StageDurationPolicy, TimelineEngine};
use site_progress::repository::progress_repo::ConstructionProgressRepository;
use uuid::Uuid;

const DEFAULT_PLOT_COUNT: i32 = 18;
const DEFAULT_SEED: u64 = 20_250_830;

const HOUSE_TYPE_ID: &str = "CT_HOUSE";
const APARTMENT_TYPE_ID: &str = "CT_APARTMENT";

// (name, color) per stage, in build order
const HOUSE_STAGES: [(&str, &str); 8] = [
    ("Groundworks", "#8d6e63"),
    ("Foundation", "#795548"),
    ("Superstructure", "#ff9800"),
    ("Roofing", "#f44336"),
    ("First Fix", "#2196f3"),
    ("Second Fix", "#3f51b5"),
    ("Decoration", "#9c27b0"),
    ("Landscaping", "#4caf50"),
];

const APARTMENT_STAGES: [(&str, &str); 6] = [
    ("Groundworks", "#8d6e63"),
    ("Foundation", "#795548"),
    ("Frame Erection", "#ff9800"),
    ("External Envelope", "#f44336"),
    ("Internal Fit-Out", "#2196f3"),
    ("Commissioning", "#4caf50"),
];

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    let plot_count = std::env::args()
        .nth(2)
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(DEFAULT_PLOT_COUNT)
        .max(1);

    let seed = std::env::args()
        .nth(3)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SEED);

    backup_and_reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path)?;

    // Create schema
    let schema_sql = include_str!("../../scripts/dev_db/schema.sql");
    conn.execute_batch(schema_sql)?;

    seed_base_data(&conn)?;

    // Progress rows go through the repository so the seeded database
    // carries exactly the history invariants the app enforces.
    let conn_arc = Arc::new(Mutex::new(conn));
    seed_plots_and_progress(conn_arc.clone(), plot_count, seed)?;

    print_quick_counts(conn_arc)?;

    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

// ==========================================
// Base data: schema version, config, catalog
// ==========================================
fn seed_base_data(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let now_sql_dt = Local::now().naive_local().format("%Y-%m-%d %H:%M:%S").to_string();

    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![CURRENT_SCHEMA_VERSION, now_sql_dt],
    )?;

    // Global config scope + the schedule policy defaults
    tx.execute(
        "INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key, created_at) VALUES ('global','GLOBAL','global',?1)",
        params![now_sql_dt],
    )?;
    let config_defaults: [(&str, &str); 5] = [
        (config_keys::BASE_STAGE_DURATION_DAYS, "14"),
        (config_keys::MAX_PLANNED_SLIP_DAYS, "4"),
        (config_keys::DURATION_JITTER_DAYS, "3"),
        (config_keys::ACTUAL_DATE_JITTER_DAYS, "1"),
        (config_keys::SAVE_DEBOUNCE_MS, "2000"),
    ];
    for (key, value) in config_defaults {
        tx.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, ?3)",
            params![key, value, now_sql_dt],
        )?;
    }

    // Construction catalog
    let types = [
        (HOUSE_TYPE_ID, "Detached House"),
        (APARTMENT_TYPE_ID, "Apartment Block"),
    ];
    for (type_id, name) in types {
        tx.execute(
            "INSERT INTO construction_type (type_id, name) VALUES (?1, ?2)",
            params![type_id, name],
        )?;
    }

    for (type_id, stages) in [
        (HOUSE_TYPE_ID, HOUSE_STAGES.as_slice()),
        (APARTMENT_TYPE_ID, APARTMENT_STAGES.as_slice()),
    ] {
        for (idx, (name, color)) in stages.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO construction_stage (stage_id, construction_type_id, name, sort_order, color)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    format!("{}_S{:02}", type_id, idx + 1),
                    type_id,
                    name,
                    (idx + 1) as i32,
                    color,
                ],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

// ==========================================
// Plots + per-stage progress and history
// ==========================================
fn seed_plots_and_progress(
    conn: Arc<Mutex<Connection>>,
    plot_count: i32,
    seed: u64,
) -> Result<(), Box<dyn Error>> {
    let today = Local::now().date_naive();
    let now = Local::now().naive_local();

    let progress_repo = ConstructionProgressRepository::from_connection(conn.clone());
    let profiles = PlotProfileKind::all();

    for i in 0..plot_count {
        let profile = profiles[(i as usize) % profiles.len()];

        // Plots sharing a profile get staggered start dates so the map
        // does not show identical rows.
        let rotation = (i as i64) / profiles.len() as i64;
        let start_date = today + Duration::days(profile.start_offset_days() + rotation * 3);

        let plot = Plot {
            plot_id: format!("PLOT{:03}", i + 1),
            name: format!("Plot {:02}", i + 1),
            construction_type_id: if i % 2 == 0 { HOUSE_TYPE_ID } else { APARTMENT_TYPE_ID }
                .to_string(),
            start_date,
        };
        let stage_count = if i % 2 == 0 {
            HOUSE_STAGES.len()
        } else {
            APARTMENT_STAGES.len()
        };

        {
            let conn = conn
                .lock()
                .map_err(|e| format!("failed to acquire connection lock: {}", e))?;
            conn.execute(
                "INSERT INTO plot (plot_id, name, construction_type_id, start_date) VALUES (?1, ?2, ?3, ?4)",
                params![plot.plot_id, plot.name, plot.construction_type_id, plot.start_date],
            )?;
        }

        let policy = StageDurationPolicy {
            speed: profile.speed(),
            ..StageDurationPolicy::default()
        };
        let plot_seed = seed.wrapping_add((i as u64).wrapping_mul(0x9e37_79b9));
        let mut engine = TimelineEngine::new(Box::new(SeededJitter::new(plot_seed)));
        let mut history_jitter = SeededJitter::new(plot_seed ^ 0x5eed);

        for stage_idx in 0..stage_count {
            let schedule = engine.derive_stage_schedule(plot.start_date, stage_idx, &policy, today);

            // Delayed plots have been replanned repeatedly; everyone
            // else carries at most one replan on top of the initial plan.
            let num_versions = if profile == PlotProfileKind::Delayed {
                2 + history_jitter.jitter_days(0, 2) as i32
            } else {
                1 + history_jitter.jitter_days(0, 1) as i32
            };

            let progress = ConstructionProgress {
                progress_id: Uuid::new_v4().to_string(),
                plot_id: plot.plot_id.clone(),
                stage_id: format!("{}_S{:02}", plot.construction_type_id, stage_idx + 1),
                programme_start_date: schedule.programme_start,
                programme_end_date: schedule.programme_end,
                planned_start_date: schedule.planned_start,
                planned_end_date: schedule.planned_end,
                actual_start_date: schedule.actual_start,
                actual_end_date: schedule.actual_end,
                completion_percentage: schedule.completion_percentage,
                current_plan_version: num_versions,
                updated_at: now,
            };
            if let Some(problem) = progress.invariant_violation() {
                return Err(format!(
                    "seeder produced an invalid record for {} stage {}: {}",
                    plot.plot_id,
                    stage_idx + 1,
                    problem
                )
                .into());
            }

            let history =
                PlanRevisionEngine::seed_history(&progress, num_versions, &mut history_jitter, now);
            progress_repo.insert_with_history(&progress, &history)?;
        }

        eprintln!(
            "  {} {:<9} start={} stages={}",
            plot.plot_id,
            profile.to_string(),
            plot.start_date,
            stage_count
        );
    }

    Ok(())
}

fn print_quick_counts(conn: Arc<Mutex<Connection>>) -> Result<(), Box<dyn Error>> {
    let conn = conn
        .lock()
        .map_err(|e| format!("failed to acquire connection lock: {}", e))?;
    let tables = [
        "construction_type",
        "construction_stage",
        "plot",
        "construction_progress",
        "construction_plan_history",
        "config_kv",
    ];

    eprintln!("Row counts:");
    for t in tables {
        let sql = format!("SELECT COUNT(*) FROM {}", t);
        let c: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        eprintln!("  {:<28} {}", t, c);
    }
    Ok(())
}
