/// Error types for newsfeed-service
use thiserror::Error;

/// Failure kinds surfaced to callers.
///
/// Cache failures have no variant here: they are absorbed by the cache layer
/// and never fail an operation.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl ServiceError {
    /// Whether the failure was caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::NotFound(_)
                | ServiceError::Forbidden(_)
                | ServiceError::Conflict(_)
                | ServiceError::InvalidInput(_)
        )
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
