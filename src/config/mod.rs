// ==========================================
// Site Progress - config layer
// ==========================================
// Schedule policy configuration, stored in the config_kv table.
// ==========================================

pub mod config_manager;
pub mod schedule_config_trait;

// Core re-exports
pub use config_manager::{config_keys, ConfigManager};
pub use schedule_config_trait::ScheduleConfigReader;
