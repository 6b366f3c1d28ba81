// ==========================================
// Site Progress - stage progress entities
// ==========================================
// ConstructionProgress: one live record per (plot, stage).
// ConstructionPlanHistory: append-only audit log of planned-date
// revisions, ordered by version_number (1-based, gapless).
// ==========================================
// Invariants:
// - actual_end_date set  => completion_percentage == 100
// - actual_start_date null => completion_percentage == 0 and actual_end_date null
// - planned dates never earlier than programme dates (slip, not acceleration)
// - highest-version history entry's planned dates == live planned dates
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::StageStatus;

/// Reason text required on every version-1 history entry
pub const INITIAL_PLAN_REASON: &str = "Initial plan";

// ==========================================
// ConstructionProgress
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionProgress {
    pub progress_id: String, // progress record ID
    pub plot_id: String,     // owning plot
    pub stage_id: String,    // catalog stage

    // ===== Programme window (baseline, set once) =====
    pub programme_start_date: NaiveDate,
    pub programme_end_date: NaiveDate,

    // ===== Planned window (current target, may slip) =====
    pub planned_start_date: NaiveDate,
    pub planned_end_date: NaiveDate,

    // ===== Actual window (observed) =====
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,

    // ===== Progress =====
    pub completion_percentage: i32, // integer in [0, 100]
    pub current_plan_version: i32,  // count of history entries for this record

    pub updated_at: NaiveDateTime,
}

impl ConstructionProgress {
    /// Stage status derived from the planned window
    pub fn status(&self, today: NaiveDate) -> StageStatus {
        if self.planned_start_date >= today {
            StageStatus::NotStarted
        } else if self.planned_end_date <= today {
            StageStatus::Complete
        } else {
            StageStatus::InProgress
        }
    }

    /// Days the planned start has slipped from the programme baseline
    pub fn slip_days(&self) -> i64 {
        (self.planned_start_date - self.programme_start_date).num_days()
    }

    /// Check the record against the documented invariants
    ///
    /// Returns the first violated invariant as a message, or None when
    /// the record is consistent. Used by tests and the seeding tooling;
    /// the repository enforces the same rules via CHECK constraints.
    pub fn invariant_violation(&self) -> Option<String> {
        if !(0..=100).contains(&self.completion_percentage) {
            return Some(format!(
                "completion_percentage {} outside [0,100]",
                self.completion_percentage
            ));
        }
        if self.actual_end_date.is_some() && self.completion_percentage != 100 {
            return Some("actual_end_date set but completion_percentage != 100".to_string());
        }
        if self.actual_start_date.is_none() {
            if self.completion_percentage != 0 {
                return Some("no actual_start_date but completion_percentage != 0".to_string());
            }
            if self.actual_end_date.is_some() {
                return Some("actual_end_date set without actual_start_date".to_string());
            }
        }
        if self.planned_start_date < self.programme_start_date {
            return Some("planned_start_date earlier than programme_start_date".to_string());
        }
        if self.planned_end_date < self.programme_end_date {
            return Some("planned_end_date earlier than programme_end_date".to_string());
        }
        if self.planned_end_date < self.planned_start_date {
            return Some("planned_end_date earlier than planned_start_date".to_string());
        }
        None
    }
}

// ==========================================
// ConstructionPlanHistory
// ==========================================
// Never mutated or deleted individually; only appended, or replaced
// wholesale by the seeding tooling (atomic replace in the repository).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionPlanHistory {
    pub history_id: String,           // history entry ID
    pub progress_id: String,          // owning progress record
    pub version_number: i32,          // 1-based, strictly increasing, gapless
    pub planned_start_date: NaiveDate,
    pub planned_end_date: NaiveDate,
    pub reason: String,               // free text; version 1 is always "Initial plan"
    pub changed_by: String,
    pub created_at: NaiveDateTime,
}

impl ConstructionPlanHistory {
    /// Validate an ordered history run against its live progress record
    ///
    /// Checks: gapless 1..N version numbers, non-decreasing created_at,
    /// version-1 reason, and final-entry agreement with the live record.
    pub fn validate_run(
        entries: &[ConstructionPlanHistory],
        live: &ConstructionProgress,
    ) -> Result<(), String> {
        if entries.is_empty() {
            return Err("history must contain at least the initial plan".to_string());
        }
        for (idx, entry) in entries.iter().enumerate() {
            let expected = (idx + 1) as i32;
            if entry.version_number != expected {
                return Err(format!(
                    "version_number gap: expected {} got {}",
                    expected, entry.version_number
                ));
            }
            if idx > 0 && entry.created_at < entries[idx - 1].created_at {
                return Err(format!("created_at decreases at version {}", entry.version_number));
            }
        }
        if entries[0].reason != INITIAL_PLAN_REASON {
            return Err(format!(
                "version 1 reason must be \"{}\", got \"{}\"",
                INITIAL_PLAN_REASON, entries[0].reason
            ));
        }
        let last = entries.last().expect("non-empty");
        if last.planned_start_date != live.planned_start_date
            || last.planned_end_date != live.planned_end_date
        {
            return Err("latest history entry diverges from live planned dates".to_string());
        }
        if live.current_plan_version != last.version_number {
            return Err(format!(
                "current_plan_version {} != latest version_number {}",
                live.current_plan_version, last.version_number
            ));
        }
        Ok(())
    }
}
