// ==========================================
// Site Progress - engine layer
// ==========================================
// Business rules for the progress timeline:
// derivation of programme/planned/actual windows, completion
// interpolation, and plan-revision bookkeeping.
// No SQL in engines; persistence goes through the repository layer.
// ==========================================

pub mod jitter;
pub mod revision;
pub mod timeline;

// Core re-exports
pub use jitter::{JitterPolicy, NoJitter, SeededJitter};
pub use revision::{PlanRevision, PlanRevisionEngine, RevisionError};
pub use timeline::{DerivedStageSchedule, StageDurationPolicy, TimelineEngine};
