// ==========================================
// Site Progress - repository layer
// ==========================================
// Data access only: no timeline rules, no revision rules.
// All queries parameterized.
// ==========================================

pub mod catalog_repo;
pub mod error;
pub mod plot_repo;
pub mod progress_repo;

// Core re-exports
pub use catalog_repo::CatalogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use plot_repo::PlotRepository;
pub use progress_repo::ConstructionProgressRepository;
