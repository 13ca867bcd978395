use axum::{
    extract::{multipart::MultipartError, rejection::PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::payload::ValidationError;
use crate::report::ReportError;
use crate::session::SubmissionError;
use crate::uploads::CollectorError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Upload error: {0}")]
    Upload(#[from] MultipartError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SubmissionError> for AppError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::Validation(e) => AppError::Validation(e),
            SubmissionError::Report(e) => AppError::Report(e),
            other @ (SubmissionError::InFlight | SubmissionError::Superseded) => {
                AppError::Conflict(other.to_string())
            }
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<CollectorError> for AppError {
    fn from(e: CollectorError) -> Self {
        AppError::NotFound(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Validation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.code(), e.to_string()),
            AppError::Report(e) => {
                tracing::error!("Report error: {e}");
                let status = match e {
                    ReportError::Auth(_) | ReportError::Unknown(_) => StatusCode::BAD_GATEWAY,
                    ReportError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
                    ReportError::TransientService(_) => StatusCode::SERVICE_UNAVAILABLE,
                    ReportError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    ReportError::Cancelled => StatusCode::CONFLICT,
                };
                (status, e.code(), e.user_message())
            }
            AppError::Upload(e) => (e.status(), "UPLOAD_ERROR", e.body_text()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
