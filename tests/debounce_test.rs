// ==========================================
// Debounced stage saver tests
// ==========================================
// Paused-clock tests for the quiet-period save loop: a save fires
// after the quiet period, a newer edit supersedes a pending one, and
// failures surface on the outcome channel.
// ==========================================


use std::sync::Arc;
use std::time::Duration;

use site_progress::api::progress_api::{ProgressApi, UpdateProgressRequest};
use site_progress::app::debounce::DebouncedStageSaver;
use site_progress::engine::timeline::StageDurationPolicy;
use site_progress::repository::catalog_repo::CatalogRepository;
use site_progress::repository::plot_repo::PlotRepository;
use site_progress::repository::progress_repo::ConstructionProgressRepository;
use test_helpers::{create_test_db, d, dt, open_test_connection, seed_catalog_fixture, test_stage_id};

fn setup() -> (tempfile::NamedTempFile, Arc<ProgressApi>) {
    site_progress::logging::init_test();
    let (temp_file, db_path) = create_test_db().expect("Failed to create test db");
    {
        let conn = open_test_connection(&db_path).expect("Failed to open db");
        seed_catalog_fixture(&conn).expect("Failed to seed catalog fixture");
    }
    let progress_repo =
        Arc::new(ConstructionProgressRepository::new(&db_path).expect("progress repo"));
    let plot_repo = Arc::new(PlotRepository::new(&db_path).expect("plot repo"));
    let catalog_repo = Arc::new(CatalogRepository::new(&db_path).expect("catalog repo"));
    let api = Arc::new(ProgressApi::new(
        progress_repo,
        plot_repo,
        catalog_repo,
        StageDurationPolicy::fixed(14),
    ));
    (temp_file, api)
}

fn update_request(stage_n: usize, pct: i32) -> UpdateProgressRequest {
    UpdateProgressRequest {
        plot_id: test_helpers::TEST_PLOT_ID.to_string(),
        stage_id: test_stage_id(stage_n),
        completion_percentage: pct,
        recorded_at: None,
    }
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_save_fires_after_quiet_period() {
    let (_temp_file, api) = setup();
    let (saver, mut rx) = DebouncedStageSaver::new(api.clone(), Duration::from_millis(2000));

    saver.schedule(update_request(1, 50), d(2025, 10, 8), dt(2025, 10, 8));

    let outcome = rx.recv().await.expect("outcome should arrive");
    assert!(outcome.ok, "save should succeed: {}", outcome.message);
    assert_eq!(outcome.stage_id, test_stage_id(1));

    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, d(2025, 10, 8))
        .expect("timeline");
    let progress = timeline.stages[0].progress.as_ref().expect("record persisted");
    assert_eq!(progress.completion_percentage, 50);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_newer_edit_supersedes_pending_save() {
    let (_temp_file, api) = setup();
    let (saver, mut rx) = DebouncedStageSaver::new(api.clone(), Duration::from_millis(2000));

    let today = d(2025, 10, 8);
    let now = dt(2025, 10, 8);

    saver.schedule(update_request(1, 30), today, now);
    tokio::time::advance(Duration::from_millis(1000)).await;

    // Second edit inside the quiet period: the 30% save must never run
    saver.schedule(update_request(1, 70), today, now);

    let outcome = rx.recv().await.expect("outcome should arrive");
    assert!(outcome.ok, "{}", outcome.message);

    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, today)
        .expect("timeline");
    let progress = timeline.stages[0].progress.as_ref().expect("record persisted");
    assert_eq!(progress.completion_percentage, 70);

    // Exactly one save happened
    assert!(rx.try_recv().is_err());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_saves_for_different_stages_run_independently() {
    let (_temp_file, api) = setup();
    let (saver, mut rx) = DebouncedStageSaver::new(api.clone(), Duration::from_millis(2000));

    let today = d(2025, 10, 20);
    let now = dt(2025, 10, 20);

    saver.schedule(update_request(1, 100), today, now);
    saver.schedule(update_request(2, 25), today, now);
    assert_eq!(saver.pending_count(), 2);

    let first = rx.recv().await.expect("first outcome");
    let second = rx.recv().await.expect("second outcome");
    assert!(first.ok && second.ok);

    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, today)
        .expect("timeline");
    assert_eq!(
        timeline.stages[0].progress.as_ref().unwrap().completion_percentage,
        100
    );
    assert_eq!(
        timeline.stages[1].progress.as_ref().unwrap().completion_percentage,
        25
    );
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_failed_save_reports_on_outcome_channel() {
    let (_temp_file, api) = setup();
    let (saver, mut rx) = DebouncedStageSaver::new(api.clone(), Duration::from_millis(2000));

    saver.schedule(update_request(1, 150), d(2025, 10, 8), dt(2025, 10, 8));

    let outcome = rx.recv().await.expect("outcome should arrive");
    assert!(!outcome.ok);
    assert!(outcome.message.contains("invalid input"), "{}", outcome.message);

    // The rejected value was never persisted
    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, d(2025, 10, 8))
        .expect("timeline");
    assert!(timeline.stages[0].progress.is_none());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_failed_save_does_not_block_later_saves() {
    let (_temp_file, api) = setup();
    let (saver, mut rx) = DebouncedStageSaver::new(api.clone(), Duration::from_millis(2000));

    let today = d(2025, 10, 8);
    let now = dt(2025, 10, 8);

    saver.schedule(update_request(1, 150), today, now);
    let failed = rx.recv().await.expect("failure outcome");
    assert!(!failed.ok);

    // The same stage key must stay schedulable after a failed save
    saver.schedule(update_request(1, 60), today, now);
    let outcome = rx.recv().await.expect("outcome should arrive");
    assert!(outcome.ok, "{}", outcome.message);
    assert_eq!(saver.pending_count(), 0);

    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, today)
        .expect("timeline");
    let progress = timeline.stages[0].progress.as_ref().expect("record persisted");
    assert_eq!(progress.completion_percentage, 60);
}
