// ==========================================
// Site Progress - timeline derivation engine
// ==========================================
// Derives, for one plot stage, the programme (baseline) window, the
// planned (current target) window, the actual (observed) dates and the
// completion percentage, all relative to an explicit `today`.
//
// Scheduling rules:
// 1. Programme windows are strictly sequential: stage n starts the day
//    after stage n-1's programme window ends; stage 0 starts at the
//    plot start date.
// 2. Planned dates are programme dates shifted forward by a
//    non-negative slip. Slippage only, never acceleration.
// 3. planned_start >= today         -> not started, 0%
// 4. planned_start < today < end    -> in progress, linear completion
//    clamped to [10, 95]; the 96-100 band is reserved for true completion
// 5. planned_end <= today           -> complete, 100%
// ==========================================

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::types::StageStatus;
use crate::engine::jitter::JitterPolicy;

/// Completion floor for a stage known to have started
pub const IN_PROGRESS_FLOOR: i32 = 10;

/// Completion ceiling before the planned end is reached
pub const IN_PROGRESS_CEILING: i32 = 95;

// ==========================================
// StageDurationPolicy
// ==========================================
// How long stages run and how far planned dates may drift from the
// programme baseline. Jitter bounds are inclusive day counts fed to
// the injected JitterPolicy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDurationPolicy {
    pub base_duration_days: i64,     // programme window length per stage
    pub speed: f64,                  // planned-duration multiplier (>1.0 = slow build)
    pub duration_jitter_days: i64,   // planned duration varies by +/- this many days
    pub max_slip_days: i64,          // planned start slips 0..=max days from programme
    pub actual_date_jitter_days: i64, // actual dates vary around planned by +/- this
}

impl Default for StageDurationPolicy {
    fn default() -> Self {
        Self {
            base_duration_days: 14,
            speed: 1.0,
            duration_jitter_days: 3,
            max_slip_days: 4,
            actual_date_jitter_days: 1,
        }
    }
}

impl StageDurationPolicy {
    /// Fixed-length policy with no variability (used by tests and
    /// anywhere a deterministic baseline is wanted)
    pub fn fixed(base_duration_days: i64) -> Self {
        Self {
            base_duration_days,
            speed: 1.0,
            duration_jitter_days: 0,
            max_slip_days: 0,
            actual_date_jitter_days: 0,
        }
    }
}

// ==========================================
// DerivedStageSchedule
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedStageSchedule {
    pub programme_start: NaiveDate,
    pub programme_end: NaiveDate,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    pub completion_percentage: i32,
}

impl DerivedStageSchedule {
    pub fn status(&self, today: NaiveDate) -> StageStatus {
        if self.planned_start >= today {
            StageStatus::NotStarted
        } else if self.planned_end <= today {
            StageStatus::Complete
        } else {
            StageStatus::InProgress
        }
    }
}

// ==========================================
// TimelineEngine
// ==========================================
pub struct TimelineEngine {
    jitter: Box<dyn JitterPolicy>,
}

impl TimelineEngine {
    pub fn new(jitter: Box<dyn JitterPolicy>) -> Self {
        Self { jitter }
    }

    /// Engine with all variability switched off: planned == programme,
    /// actual dates exactly on plan
    pub fn deterministic() -> Self {
        Self::new(Box::new(crate::engine::jitter::NoJitter))
    }

    /// Derive the full schedule for one stage
    ///
    /// # Arguments
    /// - plot_start: plot-level construction start date
    /// - stage_index: 0-based position in the ordered stage sequence
    /// - policy: duration/slip policy
    /// - today: evaluation date (threaded explicitly; the engine never
    ///   reads a process clock)
    pub fn derive_stage_schedule(
        &mut self,
        plot_start: NaiveDate,
        stage_index: usize,
        policy: &StageDurationPolicy,
        today: NaiveDate,
    ) -> DerivedStageSchedule {
        let (programme_start, programme_end) =
            Self::programme_window(plot_start, stage_index, policy);

        // Planned window: programme shifted forward by a non-negative
        // slip, with a jittered duration. Both ends are clamped so that
        // planned never beats programme.
        let slip = self.jitter.jitter_days(0, policy.max_slip_days).max(0);
        let planned_start = programme_start + Duration::days(slip);

        let jittered = self
            .jitter
            .jitter_days(-policy.duration_jitter_days, policy.duration_jitter_days);
        let planned_duration =
            ((policy.base_duration_days as f64 * policy.speed).floor() as i64 + jittered).max(1);
        let mut planned_end = planned_start + Duration::days(planned_duration);
        if planned_end < programme_end {
            planned_end = programme_end;
        }

        let (actual_start, actual_end, completion_percentage) =
            self.derive_actuals(planned_start, planned_end, policy, today);

        DerivedStageSchedule {
            programme_start,
            programme_end,
            planned_start,
            planned_end,
            actual_start,
            actual_end,
            completion_percentage,
        }
    }

    /// Derive schedules for every stage of a plot, in build order
    pub fn derive_plot_timeline(
        &mut self,
        plot_start: NaiveDate,
        stage_count: usize,
        policy: &StageDurationPolicy,
        today: NaiveDate,
    ) -> Vec<DerivedStageSchedule> {
        (0..stage_count)
            .map(|idx| self.derive_stage_schedule(plot_start, idx, policy, today))
            .collect()
    }

    /// Programme window for a stage: strictly sequential baseline,
    /// each window `base_duration_days` long, next stage starting the
    /// day after the previous window ends
    pub fn programme_window(
        plot_start: NaiveDate,
        stage_index: usize,
        policy: &StageDurationPolicy,
    ) -> (NaiveDate, NaiveDate) {
        let offset = stage_index as i64 * (policy.base_duration_days + 1);
        let start = plot_start + Duration::days(offset);
        let end = start + Duration::days(policy.base_duration_days);
        (start, end)
    }

    /// Linear completion interpolation for an in-progress stage,
    /// clamped into [IN_PROGRESS_FLOOR, IN_PROGRESS_CEILING]
    ///
    /// Monotone in `today` for a fixed window: the interpolation is
    /// linear and the clamp bounds are constants, which is what makes
    /// the overall completion curve non-decreasing as today advances.
    pub fn interpolate_completion(
        planned_start: NaiveDate,
        planned_end: NaiveDate,
        today: NaiveDate,
    ) -> i32 {
        let total_days = (planned_end - planned_start).num_days().max(1);
        let elapsed_days = (today - planned_start).num_days();
        let raw = (elapsed_days * 100) / total_days;
        (raw as i32).clamp(IN_PROGRESS_FLOOR, IN_PROGRESS_CEILING)
    }

    fn derive_actuals(
        &mut self,
        planned_start: NaiveDate,
        planned_end: NaiveDate,
        policy: &StageDurationPolicy,
        today: NaiveDate,
    ) -> (Option<NaiveDate>, Option<NaiveDate>, i32) {
        if planned_start >= today {
            // Not started. The boundary is strict: on the planned start
            // day itself nothing has been observed yet.
            return (None, None, 0);
        }

        // Started: actual start lands near the planned start, never in
        // the future relative to today
        let j = policy.actual_date_jitter_days;
        let start_offset = self.jitter.jitter_days(-j, j);
        let actual_start = (planned_start + Duration::days(start_offset)).min(today);

        if planned_end <= today {
            // Complete: actual end near the planned end, never before
            // the actual start
            let end_offset = self.jitter.jitter_days(-j, j + 1);
            let actual_end = (planned_end + Duration::days(end_offset)).max(actual_start);
            (Some(actual_start), Some(actual_end), 100)
        } else {
            // In progress
            let pct = Self::interpolate_completion(planned_start, planned_end, today);
            (Some(actual_start), None, pct)
        }
    }
}
