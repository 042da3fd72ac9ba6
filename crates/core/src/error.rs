// Central Error Type for the Application

use thiserror::Error;

use crate::domain::DomainError;

/// Application-level error type
///
/// Only returned when an invocation could not even be attempted. Every run
/// outcome, failed or not, is reported through `InvocationResult::error`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidRequest(msg) => AppError::Validation(msg),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
