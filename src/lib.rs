// ==========================================
// Site Progress - core library
// ==========================================
// Construction-site tracking backend:
// plot stage progress timelines, plan-revision
// history, and demo seeding tooling.
// Stack: Rust + SQLite
// ==========================================

// ==========================================
// Module declarations
// ==========================================

// Domain layer - entities and types
pub mod domain;

// Repository layer - data access
pub mod repository;

// Engine layer - timeline derivation and plan revision rules
pub mod engine;

// Config layer - schedule policy configuration
pub mod config;

// Database infrastructure (connection init / unified PRAGMA)
pub mod db;

// Logging
pub mod logging;

// API layer - boundary contracts consumed by the UI
pub mod api;

// App layer - state wiring and debounced saves
pub mod app;

// ==========================================
// Core type re-exports
// ==========================================

// Domain types
pub use domain::types::StageStatus;

// Domain entities
pub use domain::{
    ConstructionPlanHistory, ConstructionProgress, ConstructionStage, ConstructionType, Plot,
};

// Engines
pub use engine::{
    DerivedStageSchedule, JitterPolicy, NoJitter, PlanRevisionEngine, SeededJitter,
    StageDurationPolicy, TimelineEngine,
};

// API
pub use api::{CatalogApi, ProgressApi};

// ==========================================
// Constants
// ==========================================

// System version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// System name
pub const APP_NAME: &str = "Site Progress";

// Database schema version
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
