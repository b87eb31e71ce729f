//! Error taxonomy for the service layer.

use crate::db::repository::RepositoryError;
use crate::models::cascade::CascadeError;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error type for service operations.
///
/// Validation and not-found errors fail fast before any computation and
/// never mutate state. Cascade errors are configuration/data faults
/// (calendar horizon, dependency cycles). No service performs retries;
/// retry logic belongs to the caller's transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Caller-correctable input problem.
    #[error("{0}")]
    Validation(String),

    /// Referenced activity/schedule absent from the record store.
    #[error("{0}")]
    NotFound(String),

    /// Cascade evaluation failed (calendar horizon, cycle, bad duration).
    #[error(transparent)]
    Cascade(#[from] CascadeError),

    /// Record store failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// Whether this error should surface as a not-found condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            ServiceError::NotFound(_) => true,
            ServiceError::Repository(e) => e.is_not_found(),
            _ => false,
        }
    }
}
