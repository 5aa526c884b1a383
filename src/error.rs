use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::{paths::PathError, storage::StorageError},
    spin::SpinError,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Room store rejected or failed the operation.
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// An external provider is not configured.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    /// An external provider failed or answered with something unusable.
    #[error("{provider} request failed: {message}")]
    Upstream {
        /// Provider name.
        provider: &'static str,
        /// What went wrong.
        message: String,
    },
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(path) => ServiceError::InvalidInput(path.to_string()),
            StorageError::NotAnObject { .. } => ServiceError::InvalidInput(err.to_string()),
            StorageError::Unavailable { .. } => ServiceError::Storage(err),
        }
    }
}

impl From<PathError> for ServiceError {
    fn from(err: PathError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<SpinError> for ServiceError {
    fn from(err: SpinError) -> Self {
        match err {
            SpinError::InvalidTransition(_) | SpinError::AlreadyFinalized | SpinError::NotOwner => {
                ServiceError::InvalidState(err.to_string())
            }
            other => ServiceError::InvalidInput(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

impl From<PathError> for AppError {
    fn from(err: PathError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// An upstream provider failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or not configured.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Storage(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            err @ ServiceError::NotConfigured(_) => AppError::ServiceUnavailable(err.to_string()),
            err @ ServiceError::Upstream { .. } => AppError::BadGateway(err.to_string()),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
