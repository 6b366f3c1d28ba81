// ==========================================
// Site Progress - domain layer
// ==========================================
// Entities and types for plot construction tracking.
// No data access, no engine logic.
// ==========================================

pub mod catalog;
pub mod plot;
pub mod progress;
pub mod types;

// Core re-exports
pub use catalog::{ConstructionStage, ConstructionType};
pub use plot::Plot;
pub use progress::{ConstructionPlanHistory, ConstructionProgress};
pub use types::{PlotProfileKind, StageStatus};
