//! Domain error taxonomy.
//!
//! Services return `DomainError`; the REST layer maps each variant to one
//! HTTP status in `io::rest::error`.

use crate::domain::models::animal::AnimalValidationError;
use crate::domain::models::task::{TaskValidationError, TransitionError};

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(what: &str, id: &str) -> Self {
        DomainError::NotFound(format!("{} not found: {}", what, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        DomainError::Forbidden(message.into())
    }

    /// Machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::Validation(_) => "VALIDATION_ERROR",
            DomainError::Unauthorized(_) => "UNAUTHORIZED",
            DomainError::Forbidden(_) => "FORBIDDEN",
            DomainError::Conflict(_) => "CONFLICT",
            DomainError::Storage(_) | DomainError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<TransitionError> for DomainError {
    fn from(err: TransitionError) -> Self {
        DomainError::Conflict(err.to_string())
    }
}

impl From<TaskValidationError> for DomainError {
    fn from(err: TaskValidationError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

impl From<AnimalValidationError> for DomainError {
    fn from(err: AnimalValidationError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
