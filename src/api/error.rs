// ==========================================
// Site Progress - API layer error types
// ==========================================
// Converts repository/engine errors into user-presentable messages.
// Every failed save must reach the caller; nothing is swallowed here.
// ==========================================

use crate::engine::revision::RevisionError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API layer errors
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== Validation errors (rejected before any mutation) =====
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation failed: {0}")]
    ValidationError(String),

    // ===== Business rule errors =====
    #[error("business rule violated: {0}")]
    BusinessRuleViolation(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("version conflict: {0}")]
    VersionConflict(String),

    // ===== Data access errors (transient from the caller's view) =====
    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    #[error("database transaction failed: {0}")]
    DatabaseTransactionError(String),

    // ===== Generic =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// Whether the caller may usefully retry the same request
    ///
    /// Validation and business-rule failures are deterministic;
    /// database-level failures are surfaced as transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::DatabaseError(_)
                | ApiError::DatabaseConnectionError(_)
                | ApiError::DatabaseTransactionError(_)
        )
    }
}

// ==========================================
// From RepositoryError
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={}) does not exist", entity, id))
            }
            RepositoryError::VersionConflict { message } => ApiError::VersionConflict(message),
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("failed to acquire database lock: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("unique constraint violated: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("foreign key constraint violated: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// From RevisionError
// ==========================================
impl From<RevisionError> for ApiError {
    fn from(err: RevisionError) -> Self {
        match err {
            RevisionError::InvertedWindow { .. } | RevisionError::EmptyReason => {
                ApiError::ValidationError(err.to_string())
            }
            RevisionError::NegativeSlip(msg) => ApiError::BusinessRuleViolation(msg),
        }
    }
}

/// Result alias
pub type ApiResult<T> = Result<T, ApiError>;
