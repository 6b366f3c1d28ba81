// ==========================================
// Site Progress - plan revision engine
// ==========================================
// Bookkeeping rules for planned-date revisions:
// - every revision appends exactly one history entry with
//   version_number = current_plan_version + 1
// - the live record and the latest history entry never diverge
// - a revision to identical dates with a new reason still appends:
//   history records intent to revise, not just value change
// Persistence atomicity (live update + history insert as one unit) is
// the repository's job; this engine validates and constructs.
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::progress::{ConstructionPlanHistory, ConstructionProgress, INITIAL_PLAN_REASON};
use crate::engine::jitter::JitterPolicy;

// ==========================================
// RevisionError
// ==========================================
#[derive(Error, Debug)]
pub enum RevisionError {
    #[error("invalid planned window: end {end} is before start {start}")]
    InvertedWindow { start: NaiveDate, end: NaiveDate },

    #[error("planned dates may not move ahead of the programme baseline: {0}")]
    NegativeSlip(String),

    #[error("revision reason must not be empty")]
    EmptyReason,
}

pub type RevisionResult<T> = Result<T, RevisionError>;

// ==========================================
// PlanRevision - outcome of a revise call
// ==========================================
// Both halves are applied in one repository transaction.
#[derive(Debug, Clone)]
pub struct PlanRevision {
    pub progress: ConstructionProgress,
    pub history_entry: ConstructionPlanHistory,
}

// ==========================================
// PlanRevisionEngine
// ==========================================
pub struct PlanRevisionEngine;

impl PlanRevisionEngine {
    /// Revise a progress record's planned window
    ///
    /// Validates before producing anything; a failed call leaves no
    /// partial result to apply. The returned history entry carries
    /// version_number = current_plan_version + 1 and the returned
    /// progress has its planned dates and version count updated.
    pub fn revise_plan(
        progress: &ConstructionProgress,
        new_planned_start: NaiveDate,
        new_planned_end: NaiveDate,
        reason: &str,
        changed_by: &str,
        now: NaiveDateTime,
    ) -> RevisionResult<PlanRevision> {
        if new_planned_end < new_planned_start {
            return Err(RevisionError::InvertedWindow {
                start: new_planned_start,
                end: new_planned_end,
            });
        }
        if new_planned_start < progress.programme_start_date {
            return Err(RevisionError::NegativeSlip(format!(
                "planned start {} before programme start {}",
                new_planned_start, progress.programme_start_date
            )));
        }
        if new_planned_end < progress.programme_end_date {
            return Err(RevisionError::NegativeSlip(format!(
                "planned end {} before programme end {}",
                new_planned_end, progress.programme_end_date
            )));
        }
        if reason.trim().is_empty() {
            return Err(RevisionError::EmptyReason);
        }

        let next_version = progress.current_plan_version + 1;

        let mut updated = progress.clone();
        updated.planned_start_date = new_planned_start;
        updated.planned_end_date = new_planned_end;
        updated.current_plan_version = next_version;
        updated.updated_at = now;

        let history_entry = ConstructionPlanHistory {
            history_id: Uuid::new_v4().to_string(),
            progress_id: progress.progress_id.clone(),
            version_number: next_version,
            planned_start_date: new_planned_start,
            planned_end_date: new_planned_end,
            reason: reason.trim().to_string(),
            changed_by: changed_by.to_string(),
            created_at: now,
        };

        Ok(PlanRevision {
            progress: updated,
            history_entry,
        })
    }

    /// Generate a plausible revision history for a progress record
    ///
    /// Demo/fixture use only. Produces `num_versions` entries with
    /// gapless version numbers 1..N, strictly increasing created_at
    /// timestamps, version 1 carrying the "Initial plan" reason, and
    /// the final entry matching the live record's planned dates.
    pub fn seed_history(
        progress: &ConstructionProgress,
        num_versions: i32,
        jitter: &mut dyn JitterPolicy,
        now: NaiveDateTime,
    ) -> Vec<ConstructionPlanHistory> {
        let num_versions = num_versions.max(1);
        let window_days =
            (progress.programme_end_date - progress.programme_start_date).num_days().max(1);

        let mut entries = Vec::with_capacity(num_versions as usize);
        for v in 1..=num_versions {
            // Intermediate versions drift forward from the programme
            // baseline; the final one is pinned to the live record.
            let (start, end) = if v == num_versions {
                (progress.planned_start_date, progress.planned_end_date)
            } else {
                let drift = (v - 1) as i64 * jitter.jitter_days(2, 6);
                let start = progress.programme_start_date + chrono::Duration::days(drift);
                let end = start + chrono::Duration::days(window_days + (v - 1) as i64 * 2);
                (start, end)
            };

            let reason = if v == 1 {
                INITIAL_PLAN_REASON.to_string()
            } else {
                let causes = ["weather", "materials", "labor", "design change"];
                let pick = jitter.jitter_days(0, causes.len() as i64 - 1) as usize;
                format!("Replan due to {}", causes[pick])
            };

            entries.push(ConstructionPlanHistory {
                history_id: Uuid::new_v4().to_string(),
                progress_id: progress.progress_id.clone(),
                version_number: v,
                planned_start_date: start,
                planned_end_date: end,
                reason,
                changed_by: "System".to_string(),
                created_at: now - chrono::Duration::weeks((num_versions - v) as i64),
            });
        }
        entries
    }
}
