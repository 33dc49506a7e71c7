use mongodb::error::{ErrorKind, WriteFailure};
use serde::Serialize;
use thiserror::Error;

/// Server error code MongoDB reports for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Test not found: {0}")]
    DefinitionNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Already attempted: {0}")]
    AlreadyAttempted(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Submission failed: {0}")]
    StoreWriteFailure(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::DefinitionNotFound(_) => "DEFINITION_NOT_FOUND",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AlreadyAttempted(_) => "ALREADY_ATTEMPTED",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::StoreWriteFailure(_) => "STORE_WRITE_FAILURE",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the session that hit this error can still go on.
    ///
    /// A rejected name or a failed write leaves the attempt usable (re-prompt,
    /// retry); a missing test or a prior attempt ends it before it starts.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::ValidationError(_)
                | AppError::StoreWriteFailure(_)
                | AppError::InvalidState(_)
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            error: err.to_string(),
            code: err.error_code(),
        }
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *err.kind {
            if write_error.code == DUPLICATE_KEY_CODE {
                return AppError::AlreadyExists(write_error.message.clone());
            }
        }
        AppError::DatabaseError(err.to_string())
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(format!("Malformed JSON: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
