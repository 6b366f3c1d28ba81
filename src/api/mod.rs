// ==========================================
// Site Progress - API layer
// ==========================================
// Boundary contracts the UI calls into. Validates input before any
// mutation and converts layer errors into presentable messages.
// ==========================================

pub mod catalog_api;
pub mod error;
pub mod progress_api;

// Core re-exports
pub use catalog_api::CatalogApi;
pub use error::{ApiError, ApiResult};
pub use progress_api::{
    PlotTimelineResponse, ProgressApi, RevisePlanRequest, StageTimeline, UpdateProgressRequest,
};
