// ==========================================
// Site Progress - progress API
// ==========================================
// Stage progress reads/writes for the plot dialog and dashboard:
// - get_plot_timeline: progress + full plan history per stage
// - record_progress: completion update with create-fallback semantics
// - revise_plan: planned-date revision with atomic history append
// - replace_plan_history: wholesale regeneration (seeding tooling)
// Dates cross this boundary as ISO-8601 calendar dates, never
// date-times; day granularity avoids timezone ambiguity.
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::progress::{
    ConstructionPlanHistory, ConstructionProgress, INITIAL_PLAN_REASON,
};
use crate::domain::types::StageStatus;
use crate::engine::revision::PlanRevisionEngine;
use crate::engine::timeline::{StageDurationPolicy, TimelineEngine};
use crate::repository::catalog_repo::CatalogRepository;
use crate::repository::plot_repo::PlotRepository;
use crate::repository::progress_repo::ConstructionProgressRepository;

// ==========================================
// Request/response DTOs
// ==========================================

/// Completion update submitted by the plot dialog
///
/// `recorded_at` optionally pins the observation date; when absent the
/// caller-supplied `today` is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProgressRequest {
    pub plot_id: String,
    pub stage_id: String,
    pub completion_percentage: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisePlanRequest {
    pub plot_id: String,
    pub stage_id: String,
    pub new_planned_start: NaiveDate,
    pub new_planned_end: NaiveDate,
    pub reason: String,
    pub changed_by: String,
}

/// One stage's progress with its audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTimeline {
    pub stage_id: String,
    pub stage_name: String,
    pub sort_order: i32,
    pub color: String,
    pub status: Option<StageStatus>,
    pub progress: Option<ConstructionProgress>,
    pub history: Vec<ConstructionPlanHistory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotTimelineResponse {
    pub plot_id: String,
    pub plot_name: String,
    pub start_date: NaiveDate,
    pub stages: Vec<StageTimeline>,
}

// ==========================================
// ProgressApi
// ==========================================
pub struct ProgressApi {
    progress_repo: Arc<ConstructionProgressRepository>,
    plot_repo: Arc<PlotRepository>,
    catalog_repo: Arc<CatalogRepository>,
    /// Policy used when create-fallback has to derive a baseline window
    default_policy: StageDurationPolicy,
}

impl ProgressApi {
    pub fn new(
        progress_repo: Arc<ConstructionProgressRepository>,
        plot_repo: Arc<PlotRepository>,
        catalog_repo: Arc<CatalogRepository>,
        default_policy: StageDurationPolicy,
    ) -> Self {
        Self {
            progress_repo,
            plot_repo,
            catalog_repo,
            default_policy,
        }
    }

    // ==========================================
    // Reads
    // ==========================================

    /// Full timeline for a plot: every catalog stage in build order,
    /// with its live progress record and plan history where present
    pub fn get_plot_timeline(&self, plot_id: &str, today: NaiveDate) -> ApiResult<PlotTimelineResponse> {
        let plot = self
            .plot_repo
            .find_by_id(plot_id)?
            .ok_or_else(|| ApiError::NotFound(format!("plot {} does not exist", plot_id)))?;

        let stages = self.catalog_repo.list_stages(&plot.construction_type_id)?;

        let mut timelines = Vec::with_capacity(stages.len());
        for stage in stages {
            let progress = self
                .progress_repo
                .find_by_plot_and_stage(plot_id, &stage.stage_id)?;
            let history = match &progress {
                Some(p) => self.progress_repo.list_history(&p.progress_id)?,
                None => Vec::new(),
            };
            timelines.push(StageTimeline {
                stage_id: stage.stage_id,
                stage_name: stage.name,
                sort_order: stage.sort_order,
                color: stage.color,
                status: progress.as_ref().map(|p| p.status(today)),
                progress,
                history,
            });
        }

        Ok(PlotTimelineResponse {
            plot_id: plot.plot_id,
            plot_name: plot.name,
            start_date: plot.start_date,
            stages: timelines,
        })
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Record a stage's completion percentage
    ///
    /// Validates before any mutation. When no live record exists for
    /// the (plot, stage) pair the call falls back to create semantics:
    /// a baseline window is derived from the plot start date and the
    /// stage's position, and the record is created together with its
    /// "Initial plan" history entry in one transaction.
    pub fn record_progress(
        &self,
        request: &UpdateProgressRequest,
        today: NaiveDate,
        now: NaiveDateTime,
    ) -> ApiResult<ConstructionProgress> {
        if !(0..=100).contains(&request.completion_percentage) {
            return Err(ApiError::InvalidInput(format!(
                "completion percentage must be within [0, 100], got {}",
                request.completion_percentage
            )));
        }

        let mut progress = match self
            .progress_repo
            .find_by_plot_and_stage(&request.plot_id, &request.stage_id)?
        {
            Some(existing) => existing,
            None => self.create_initial_record(&request.plot_id, &request.stage_id, now)?,
        };

        Self::apply_observation(
            &mut progress,
            request.completion_percentage,
            request.recorded_at,
            today,
            now,
        );

        if let Some(violation) = progress.invariant_violation() {
            // Should be unreachable given apply_observation; refuse to
            // persist an inconsistent record either way
            return Err(ApiError::InternalError(format!(
                "progress record would violate invariant: {}",
                violation
            )));
        }

        self.progress_repo.update_observed_progress(&progress)?;
        tracing::info!(
            plot_id = %request.plot_id,
            stage_id = %request.stage_id,
            completion = progress.completion_percentage,
            "stage progress recorded"
        );
        Ok(progress)
    }

    /// Revise a stage's planned window
    ///
    /// The live-record update and the history append are applied as
    /// one unit by the repository; revising a record that no longer
    /// exists reports NotFound so the caller can fall back to create.
    pub fn revise_plan(
        &self,
        request: &RevisePlanRequest,
        now: NaiveDateTime,
    ) -> ApiResult<ConstructionProgress> {
        let progress = self
            .progress_repo
            .find_by_plot_and_stage(&request.plot_id, &request.stage_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "no progress record for plot {} stage {}",
                    request.plot_id, request.stage_id
                ))
            })?;

        let revision = PlanRevisionEngine::revise_plan(
            &progress,
            request.new_planned_start,
            request.new_planned_end,
            &request.reason,
            &request.changed_by,
            now,
        )?;

        self.progress_repo.apply_revision(&revision)?;
        tracing::info!(
            plot_id = %request.plot_id,
            stage_id = %request.stage_id,
            version = revision.progress.current_plan_version,
            "plan revised"
        );
        Ok(revision.progress)
    }

    /// Replace a record's plan history wholesale (seeding tooling)
    ///
    /// The replacement run is validated for internal consistency first;
    /// the repository then swaps it in atomically and syncs the live
    /// record to the final entry.
    pub fn replace_plan_history(
        &self,
        plot_id: &str,
        stage_id: &str,
        entries: &[ConstructionPlanHistory],
    ) -> ApiResult<ConstructionProgress> {
        Self::validate_history_run(entries)?;

        let progress = self
            .progress_repo
            .find_by_plot_and_stage(plot_id, stage_id)?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "no progress record for plot {} stage {}",
                    plot_id, stage_id
                ))
            })?;

        self.progress_repo.replace_history(&progress.progress_id, entries)?;
        let updated = self
            .progress_repo
            .find_by_id(&progress.progress_id)?
            .ok_or_else(|| {
                ApiError::InternalError("progress record vanished during history replace".to_string())
            })?;
        Ok(updated)
    }

    /// Delete a stage's progress record; history cascades with it
    pub fn delete_progress(&self, plot_id: &str, stage_id: &str) -> ApiResult<bool> {
        let affected = self.progress_repo.delete_by_plot_and_stage(plot_id, stage_id)?;
        Ok(affected > 0)
    }

    // ==========================================
    // Internals
    // ==========================================

    /// Create-fallback: baseline record at the programme window with a
    /// version-1 "Initial plan" history entry, written atomically
    fn create_initial_record(
        &self,
        plot_id: &str,
        stage_id: &str,
        now: NaiveDateTime,
    ) -> ApiResult<ConstructionProgress> {
        let plot = self
            .plot_repo
            .find_by_id(plot_id)?
            .ok_or_else(|| ApiError::NotFound(format!("plot {} does not exist", plot_id)))?;

        let stages = self.catalog_repo.list_stages(&plot.construction_type_id)?;
        let stage_index = stages
            .iter()
            .position(|s| s.stage_id == stage_id)
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "stage {} is not part of construction type {}",
                    stage_id, plot.construction_type_id
                ))
            })?;

        let (programme_start, programme_end) =
            TimelineEngine::programme_window(plot.start_date, stage_index, &self.default_policy);

        let progress = ConstructionProgress {
            progress_id: Uuid::new_v4().to_string(),
            plot_id: plot_id.to_string(),
            stage_id: stage_id.to_string(),
            programme_start_date: programme_start,
            programme_end_date: programme_end,
            planned_start_date: programme_start,
            planned_end_date: programme_end,
            actual_start_date: None,
            actual_end_date: None,
            completion_percentage: 0,
            current_plan_version: 1,
            updated_at: now,
        };
        let initial_history = ConstructionPlanHistory {
            history_id: Uuid::new_v4().to_string(),
            progress_id: progress.progress_id.clone(),
            version_number: 1,
            planned_start_date: programme_start,
            planned_end_date: programme_end,
            reason: INITIAL_PLAN_REASON.to_string(),
            changed_by: "System".to_string(),
            created_at: now,
        };

        self.progress_repo.insert_with_history(&progress, &[initial_history])?;
        tracing::info!(plot_id = %plot_id, stage_id = %stage_id, "progress record created");
        Ok(progress)
    }

    /// Fold an observed completion value into the record while keeping
    /// the actual-date invariants intact
    fn apply_observation(
        progress: &mut ConstructionProgress,
        completion_percentage: i32,
        recorded_at: Option<NaiveDate>,
        today: NaiveDate,
        now: NaiveDateTime,
    ) {
        let observed_on = recorded_at.unwrap_or(today);
        progress.completion_percentage = completion_percentage;

        if completion_percentage > 0 && progress.actual_start_date.is_none() {
            progress.actual_start_date = Some(observed_on);
        }

        if completion_percentage == 100 {
            let end = match progress.actual_start_date {
                Some(start) => observed_on.max(start),
                None => observed_on,
            };
            progress.actual_end_date = Some(end);
        } else {
            // The 96-100 band belongs to true completion only
            progress.actual_end_date = None;
        }

        progress.updated_at = now;
    }

    /// Internal-consistency validation for a replacement history run
    fn validate_history_run(entries: &[ConstructionPlanHistory]) -> ApiResult<()> {
        if entries.is_empty() {
            return Err(ApiError::ValidationError(
                "replacement history must contain at least the initial plan".to_string(),
            ));
        }
        for (idx, entry) in entries.iter().enumerate() {
            let expected = (idx + 1) as i32;
            if entry.version_number != expected {
                return Err(ApiError::ValidationError(format!(
                    "history version numbers must be gapless: expected {} got {}",
                    expected, entry.version_number
                )));
            }
            if entry.planned_end_date < entry.planned_start_date {
                return Err(ApiError::ValidationError(format!(
                    "history version {} has an inverted planned window",
                    entry.version_number
                )));
            }
            if idx > 0 && entry.created_at < entries[idx - 1].created_at {
                return Err(ApiError::ValidationError(format!(
                    "history created_at must not decrease (version {})",
                    entry.version_number
                )));
            }
        }
        if entries[0].reason != INITIAL_PLAN_REASON {
            return Err(ApiError::ValidationError(format!(
                "version 1 reason must be \"{}\"",
                INITIAL_PLAN_REASON
            )));
        }
        Ok(())
    }
}
