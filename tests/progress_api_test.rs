// ==========================================
// Progress API integration tests
// ==========================================
// Full stack over a real SQLite file: validation ordering,
// create-fallback semantics, actual-date bookkeeping and the
// timeline read model.
// ==========================================


use std::sync::Arc;

use site_progress::api::error::ApiError;
use site_progress::api::progress_api::{ProgressApi, RevisePlanRequest, UpdateProgressRequest};
use site_progress::domain::progress::{ConstructionPlanHistory, INITIAL_PLAN_REASON};
use site_progress::domain::types::StageStatus;
use site_progress::engine::jitter::SeededJitter;
use site_progress::engine::revision::PlanRevisionEngine;
use site_progress::engine::timeline::StageDurationPolicy;
use site_progress::repository::catalog_repo::CatalogRepository;
use site_progress::repository::plot_repo::PlotRepository;
use site_progress::repository::progress_repo::ConstructionProgressRepository;
use test_helpers::{create_test_db, d, dt, open_test_connection, seed_catalog_fixture, test_stage_id};

fn setup() -> (tempfile::NamedTempFile, ProgressApi) {
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
    let api = ProgressApi::new(
        progress_repo,
        plot_repo,
        catalog_repo,
        StageDurationPolicy::fixed(14),
    );
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

#[test]
fn test_record_progress_rejects_out_of_range_before_any_write() {
    let (_temp_file, api) = setup();

    for bad in [-1, 101, 150] {
        let result = api.record_progress(&update_request(1, bad), d(2025, 10, 5), dt(2025, 10, 5));
        assert!(matches!(result, Err(ApiError::InvalidInput(_))), "pct {}", bad);
    }

    // Validation failed before create-fallback could run
    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, d(2025, 10, 5))
        .expect("timeline");
    assert!(timeline.stages.iter().all(|s| s.progress.is_none()));
}

#[test]
fn test_record_progress_creates_record_with_initial_plan() {
    let (_temp_file, api) = setup();

    // No record exists yet for (PLOT_A, S01): create-fallback derives
    // the stage-1 programme window from the plot start date
    let progress = api
        .record_progress(&update_request(1, 50), d(2025, 10, 8), dt(2025, 10, 8))
        .expect("record should succeed");

    assert_eq!(progress.programme_start_date, d(2025, 10, 1));
    assert_eq!(progress.programme_end_date, d(2025, 10, 15));
    assert_eq!(progress.planned_start_date, progress.programme_start_date);
    assert_eq!(progress.completion_percentage, 50);
    assert_eq!(progress.current_plan_version, 1);
    assert_eq!(progress.actual_start_date, Some(d(2025, 10, 8)));
    assert_eq!(progress.actual_end_date, None);

    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, d(2025, 10, 8))
        .expect("timeline");
    let stage = &timeline.stages[0];
    let history = &stage.history;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version_number, 1);
    assert_eq!(history[0].reason, INITIAL_PLAN_REASON);
}

#[test]
fn test_record_progress_second_stage_window_is_offset() {
    let (_temp_file, api) = setup();

    // Stage 2 starts the day after stage 1's programme window ends
    let progress = api
        .record_progress(&update_request(2, 10), d(2025, 10, 20), dt(2025, 10, 20))
        .expect("record should succeed");
    assert_eq!(progress.programme_start_date, d(2025, 10, 16));
    assert_eq!(progress.programme_end_date, d(2025, 10, 30));
}

#[test]
fn test_record_progress_actual_date_lifecycle() {
    let (_temp_file, api) = setup();

    // 0%: created but not observed started
    let p = api
        .record_progress(&update_request(1, 0), d(2025, 10, 2), dt(2025, 10, 2))
        .expect("record");
    assert_eq!(p.actual_start_date, None);
    assert_eq!(p.completion_percentage, 0);

    // First nonzero observation pins actual_start
    let p = api
        .record_progress(&update_request(1, 40), d(2025, 10, 6), dt(2025, 10, 6))
        .expect("record");
    assert_eq!(p.actual_start_date, Some(d(2025, 10, 6)));
    assert_eq!(p.actual_end_date, None);

    // A later observation does not move actual_start
    let p = api
        .record_progress(&update_request(1, 70), d(2025, 10, 10), dt(2025, 10, 10))
        .expect("record");
    assert_eq!(p.actual_start_date, Some(d(2025, 10, 6)));

    // 100% sets actual_end
    let p = api
        .record_progress(&update_request(1, 100), d(2025, 10, 16), dt(2025, 10, 16))
        .expect("record");
    assert_eq!(p.actual_end_date, Some(d(2025, 10, 16)));

    // Walking completion back down clears actual_end again
    let p = api
        .record_progress(&update_request(1, 90), d(2025, 10, 17), dt(2025, 10, 17))
        .expect("record");
    assert_eq!(p.actual_end_date, None);
    assert_eq!(p.actual_start_date, Some(d(2025, 10, 6)));
    assert!(p.invariant_violation().is_none());
}

#[test]
fn test_record_progress_honors_recorded_at() {
    let (_temp_file, api) = setup();

    let request = UpdateProgressRequest {
        plot_id: test_helpers::TEST_PLOT_ID.to_string(),
        stage_id: test_stage_id(1),
        completion_percentage: 30,
        recorded_at: Some(d(2025, 10, 4)),
    };
    let p = api
        .record_progress(&request, d(2025, 10, 8), dt(2025, 10, 8))
        .expect("record");
    // Backdated observation: actual_start is the recorded date, not today
    assert_eq!(p.actual_start_date, Some(d(2025, 10, 4)));
}

#[test]
fn test_revise_plan_twice_reaches_version_three() {
    let (_temp_file, api) = setup();

    api.record_progress(&update_request(1, 0), d(2025, 10, 2), dt(2025, 10, 2))
        .expect("create");

    let first = RevisePlanRequest {
        plot_id: test_helpers::TEST_PLOT_ID.to_string(),
        stage_id: test_stage_id(1),
        new_planned_start: d(2025, 10, 3),
        new_planned_end: d(2025, 10, 17),
        reason: "Replan due to weather".to_string(),
        changed_by: "site-manager".to_string(),
    };
    let p = api.revise_plan(&first, dt(2025, 10, 2)).expect("first revision");
    assert_eq!(p.current_plan_version, 2);

    let second = RevisePlanRequest {
        new_planned_start: d(2025, 10, 6),
        new_planned_end: d(2025, 10, 20),
        reason: "Replan due to materials".to_string(),
        ..first
    };
    let p = api.revise_plan(&second, dt(2025, 10, 9)).expect("second revision");
    assert_eq!(p.current_plan_version, 3);
    assert_eq!(p.planned_start_date, d(2025, 10, 6));

    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, d(2025, 10, 9))
        .expect("timeline");
    let history = &timeline.stages[0].history;
    let versions: Vec<i32> = history.iter().map(|h| h.version_number).collect();
    assert_eq!(versions, vec![1, 2, 3]);
    ConstructionPlanHistory::validate_run(history, timeline.stages[0].progress.as_ref().unwrap())
        .expect("run should be consistent");
}

#[test]
fn test_revise_plan_missing_record_is_not_found() {
    let (_temp_file, api) = setup();

    let request = RevisePlanRequest {
        plot_id: test_helpers::TEST_PLOT_ID.to_string(),
        stage_id: test_stage_id(3),
        new_planned_start: d(2025, 11, 2),
        new_planned_end: d(2025, 11, 16),
        reason: "Replan due to weather".to_string(),
        changed_by: "site-manager".to_string(),
    };
    let result = api.revise_plan(&request, dt(2025, 10, 2));
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test]
fn test_revise_plan_rejects_acceleration() {
    let (_temp_file, api) = setup();

    api.record_progress(&update_request(1, 0), d(2025, 10, 2), dt(2025, 10, 2))
        .expect("create");

    // Programme starts 2025-10-01; pulling the plan before that is
    // acceleration, which slippage-only bookkeeping forbids
    let request = RevisePlanRequest {
        plot_id: test_helpers::TEST_PLOT_ID.to_string(),
        stage_id: test_stage_id(1),
        new_planned_start: d(2025, 9, 28),
        new_planned_end: d(2025, 10, 15),
        reason: "pulled forward".to_string(),
        changed_by: "site-manager".to_string(),
    };
    let result = api.revise_plan(&request, dt(2025, 10, 2));
    assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));

    // Nothing applied
    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, d(2025, 10, 2))
        .expect("timeline");
    let progress = timeline.stages[0].progress.as_ref().unwrap();
    assert_eq!(progress.current_plan_version, 1);
    assert_eq!(progress.planned_start_date, d(2025, 10, 1));
}

#[test]
fn test_get_plot_timeline_covers_every_catalog_stage() {
    let (_temp_file, api) = setup();

    api.record_progress(&update_request(1, 100), d(2025, 10, 20), dt(2025, 10, 20))
        .expect("record");
    api.record_progress(&update_request(2, 40), d(2025, 10, 20), dt(2025, 10, 20))
        .expect("record");

    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, d(2025, 10, 20))
        .expect("timeline");
    assert_eq!(timeline.plot_name, "Plot A");
    assert_eq!(timeline.stages.len(), 3);

    // Build order, with untouched stages present but empty
    let orders: Vec<i32> = timeline.stages.iter().map(|s| s.sort_order).collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert_eq!(timeline.stages[0].status, Some(StageStatus::Complete));
    assert_eq!(timeline.stages[1].status, Some(StageStatus::InProgress));
    assert!(timeline.stages[2].progress.is_none());
    assert!(timeline.stages[2].history.is_empty());
    assert_eq!(timeline.stages[2].status, None);
}

#[test]
fn test_timeline_serializes_dates_and_status_for_the_wire() {
    let (_temp_file, api) = setup();

    api.record_progress(&update_request(1, 40), d(2025, 10, 6), dt(2025, 10, 6))
        .expect("record");

    let timeline = api
        .get_plot_timeline(test_helpers::TEST_PLOT_ID, d(2025, 10, 6))
        .expect("timeline");
    let json = serde_json::to_value(&timeline).expect("serialize");

    // Calendar dates cross the boundary as plain YYYY-MM-DD strings
    assert_eq!(json["start_date"], "2025-10-01");
    let stage = &json["stages"][0];
    assert_eq!(stage["status"], "IN_PROGRESS");
    assert_eq!(stage["progress"]["programme_start_date"], "2025-10-01");
    assert_eq!(stage["progress"]["actual_start_date"], "2025-10-06");
    assert!(stage["progress"]["actual_end_date"].is_null());
    assert_eq!(stage["history"][0]["version_number"], 1);

    // Untouched stages carry explicit nulls, not missing keys
    assert!(json["stages"][2]["progress"].is_null());
    assert!(json["stages"][2]["status"].is_null());
}

#[test]
fn test_get_plot_timeline_unknown_plot_is_not_found() {
    let (_temp_file, api) = setup();
    let result = api.get_plot_timeline("PLOT_MISSING", d(2025, 10, 20));
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test]
fn test_replace_plan_history_validates_then_syncs() {
    let (_temp_file, api) = setup();

    let progress = api
        .record_progress(&update_request(1, 0), d(2025, 10, 2), dt(2025, 10, 2))
        .expect("create");

    // Gapped run is rejected up front
    let mut jitter = SeededJitter::new(11);
    let mut target = progress.clone();
    target.planned_start_date = d(2025, 10, 4);
    target.planned_end_date = d(2025, 10, 19);
    target.current_plan_version = 3;
    let mut gapped = PlanRevisionEngine::seed_history(&target, 3, &mut jitter, dt(2025, 11, 1));
    gapped[1].version_number = 5;
    let result =
        api.replace_plan_history(test_helpers::TEST_PLOT_ID, &test_stage_id(1), &gapped);
    assert!(matches!(result, Err(ApiError::ValidationError(_))));

    // Valid run replaces wholesale and syncs the live record
    let entries = PlanRevisionEngine::seed_history(&target, 3, &mut jitter, dt(2025, 11, 1));
    let live = api
        .replace_plan_history(test_helpers::TEST_PLOT_ID, &test_stage_id(1), &entries)
        .expect("replace should succeed");
    assert_eq!(live.current_plan_version, 3);
    assert_eq!(live.planned_start_date, d(2025, 10, 4));
    assert_eq!(live.planned_end_date, d(2025, 10, 19));
}

#[test]
fn test_delete_progress_reports_whether_anything_was_removed() {
    let (_temp_file, api) = setup();

    api.record_progress(&update_request(1, 20), d(2025, 10, 5), dt(2025, 10, 5))
        .expect("create");

    assert!(api
        .delete_progress(test_helpers::TEST_PLOT_ID, &test_stage_id(1))
        .expect("delete"));
    assert!(!api
        .delete_progress(test_helpers::TEST_PLOT_ID, &test_stage_id(1))
        .expect("second delete"));
}
