// ==========================================
// Site Progress - schedule config reader trait
// ==========================================
// Read-only configuration interface the app layer uses to build the
// engine's StageDurationPolicy and the debounce interval. No writes,
// no business logic.
// ==========================================

use async_trait::async_trait;
use std::error::Error;

use crate::engine::timeline::StageDurationPolicy;

// ==========================================
// ScheduleConfigReader trait
// ==========================================
// Implementor: ConfigManager (reads the config_kv table)
#[async_trait]
pub trait ScheduleConfigReader: Send + Sync {
    /// Programme window length per stage, in days
    ///
    /// # Default
    /// - 14
    async fn get_base_stage_duration_days(&self) -> Result<i64, Box<dyn Error>>;

    /// Maximum planned-start slip from the programme baseline, in days
    ///
    /// # Default
    /// - 4
    async fn get_max_planned_slip_days(&self) -> Result<i64, Box<dyn Error>>;

    /// Planned-duration jitter bound, in days (applied as +/-)
    ///
    /// # Default
    /// - 3
    async fn get_duration_jitter_days(&self) -> Result<i64, Box<dyn Error>>;

    /// Actual-date jitter bound around planned dates, in days
    ///
    /// # Default
    /// - 1
    async fn get_actual_date_jitter_days(&self) -> Result<i64, Box<dyn Error>>;

    /// Quiet period before a pending stage edit is saved, in milliseconds
    ///
    /// # Default
    /// - 2000
    async fn get_save_debounce_ms(&self) -> Result<u64, Box<dyn Error>>;

    /// Assemble the full duration policy (speed comes from the caller;
    /// it is a per-plot profile attribute, not global config)
    async fn get_duration_policy(&self, speed: f64) -> Result<StageDurationPolicy, Box<dyn Error>> {
        let base_duration_days = self.get_base_stage_duration_days().await?;
        let duration_jitter_days = self.get_duration_jitter_days().await?;
        let max_slip_days = self.get_max_planned_slip_days().await?;
        let actual_date_jitter_days = self.get_actual_date_jitter_days().await?;
        Ok(StageDurationPolicy {
            base_duration_days,
            speed,
            duration_jitter_days,
            max_slip_days,
            actual_date_jitter_days,
        })
    }
}
