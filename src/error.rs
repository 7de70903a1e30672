use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Errors that can occur in service layer operations.
///
/// Every variant is scoped to a single participant; none of them should take
/// the process down.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Connection attempt without a usable participant identity.
    #[error("invalid participant: {0}")]
    InvalidParticipant(String),
    /// The question bank failed to produce the question sequence.
    #[error("question bank failure")]
    AdapterFailure(#[source] StorageError),
    /// The question bank did not answer in time.
    #[error("question bank timed out")]
    AdapterTimeout,
    /// Requested participant or resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::AdapterFailure(err)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidParticipant(format!("validation failed: {err}"))
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
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidParticipant(message) => AppError::BadRequest(message),
            ServiceError::AdapterFailure(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::AdapterTimeout => {
                AppError::ServiceUnavailable("question bank timed out".into())
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
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
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
