// ==========================================
// Site Progress - app layer
// ==========================================
// State wiring for the API surface and the debounced save loop.
// ==========================================

pub mod debounce;
pub mod state;

// Core re-exports
pub use debounce::{DebouncedStageSaver, SaveOutcome};
pub use state::{get_default_db_path, AppState};
