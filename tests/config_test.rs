// ==========================================
// ConfigManager integration tests
// ==========================================
// Config values stored in config_kv must reach the engine's duration
// policy; missing keys fall back to documented defaults and malformed
// values are errors, not silent defaults.
// ==========================================


use std::sync::Arc;

use site_progress::api::progress_api::{ProgressApi, UpdateProgressRequest};
use site_progress::config::{ConfigManager, ScheduleConfigReader};
use site_progress::repository::catalog_repo::CatalogRepository;
use site_progress::repository::plot_repo::PlotRepository;
use site_progress::repository::progress_repo::ConstructionProgressRepository;
use test_helpers::{create_test_db, d, dt, open_test_connection, seed_catalog_fixture, test_stage_id};

#[tokio::test]
async fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path);
    assert!(config_manager.is_ok(), "ConfigManager should be created successfully");
}

#[tokio::test]
async fn test_defaults_when_keys_missing() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert_eq!(config_manager.get_base_stage_duration_days().await.unwrap(), 14);
    assert_eq!(config_manager.get_max_planned_slip_days().await.unwrap(), 4);
    assert_eq!(config_manager.get_duration_jitter_days().await.unwrap(), 3);
    assert_eq!(config_manager.get_actual_date_jitter_days().await.unwrap(), 1);
    assert_eq!(config_manager.get_save_debounce_ms().await.unwrap(), 2000);
}

#[tokio::test]
async fn test_stored_values_override_defaults() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    {
        let conn = open_test_connection(&db_path).expect("Failed to open db");
        test_helpers::insert_test_config(&conn).expect("Failed to insert test config");
    }
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_global_config_value("base_stage_duration_days", "20")
        .expect("set should succeed");
    config_manager
        .set_global_config_value("save_debounce_ms", "500")
        .expect("set should succeed");

    assert_eq!(config_manager.get_base_stage_duration_days().await.unwrap(), 20);
    assert_eq!(config_manager.get_save_debounce_ms().await.unwrap(), 500);

    let policy = config_manager.get_duration_policy(1.5).await.expect("policy");
    assert_eq!(policy.base_duration_days, 20);
    assert_eq!(policy.speed, 1.5);
    assert_eq!(policy.max_slip_days, 4);
}

#[test]
fn test_loaded_policy_changes_the_programme_window() {
    // The same wiring AppState uses: policy read from config_kv, fed
    // into ProgressApi, visible in create-fallback scheduling
    site_progress::logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    {
        let conn = open_test_connection(&db_path).expect("Failed to open db");
        seed_catalog_fixture(&conn).expect("Failed to seed catalog fixture");
    }

    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_global_config_value("base_stage_duration_days", "20")
        .expect("set should succeed");
    let policy = config_manager.load_duration_policy(1.0).expect("policy");
    assert_eq!(policy.base_duration_days, 20);

    let api = ProgressApi::new(
        Arc::new(ConstructionProgressRepository::new(&db_path).expect("progress repo")),
        Arc::new(PlotRepository::new(&db_path).expect("plot repo")),
        Arc::new(CatalogRepository::new(&db_path).expect("catalog repo")),
        policy,
    );

    // Plot starts 2025-10-01: with 20-day stages, stage 1's programme
    // window runs to 10-21 and stage 2 starts 10-22 (not the 14-day
    // default's 10-15 / 10-16)
    let request = UpdateProgressRequest {
        plot_id: test_helpers::TEST_PLOT_ID.to_string(),
        stage_id: test_stage_id(1),
        completion_percentage: 0,
        recorded_at: None,
    };
    let progress = api
        .record_progress(&request, d(2025, 10, 2), dt(2025, 10, 2))
        .expect("record");
    assert_eq!(progress.programme_start_date, d(2025, 10, 1));
    assert_eq!(progress.programme_end_date, d(2025, 10, 21));

    let request = UpdateProgressRequest {
        stage_id: test_stage_id(2),
        ..request
    };
    let progress = api
        .record_progress(&request, d(2025, 10, 2), dt(2025, 10, 2))
        .expect("record");
    assert_eq!(progress.programme_start_date, d(2025, 10, 22));
}

#[tokio::test]
async fn test_negative_debounce_is_rejected() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_global_config_value("save_debounce_ms", "-5")
        .expect("set should succeed");
    assert!(config_manager.get_save_debounce_ms().await.is_err());
}

#[tokio::test]
async fn test_non_integer_value_is_an_error() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config_manager
        .set_global_config_value("base_stage_duration_days", "a fortnight")
        .expect("set should succeed");
    assert!(config_manager.get_base_stage_duration_days().await.is_err());
}
