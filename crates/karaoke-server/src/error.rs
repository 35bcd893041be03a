//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use karaoke_jobs::JobError;
use serde::Serialize;
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request.
    #[error("{0}")]
    BadRequest(String),

    /// Artifact requested before the job finished.
    #[error("{0}")]
    Conflict(String),

    /// The job failed; carries the recorded diagnostic verbatim.
    #[error("{0}")]
    JobFailed(String),

    /// Required server configuration is absent.
    #[error("{0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JobError> for ServerError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::NotFound(msg) => ServerError::NotFound(msg),
            JobError::Conflict(msg) => ServerError::Conflict(msg),
            JobError::Failed(msg) => ServerError::JobFailed(msg),
            JobError::Validation(msg) => ServerError::BadRequest(msg),
            JobError::Configuration(msg) => ServerError::Config(msg),
            JobError::Stage(e) => ServerError::Internal(e.to_string()),
            e @ (JobError::AlreadyExists(_)
            | JobError::InvalidTransition { .. }
            | JobError::Io(_)) => ServerError::Internal(e.to_string()),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Conflict(_) => (StatusCode::CONFLICT, "not_ready"),
            ServerError::JobFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "job_failed"),
            ServerError::Config(_) => (StatusCode::BAD_REQUEST, "config_error"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = self.to_string();

        match &self {
            ServerError::Internal(_) | ServerError::JobFailed(_) => {
                tracing::error!(status = %status, code, error = %message, "Server error");
            }
            _ => {
                tracing::warn!(status = %status, code, error = %message, "Client error");
            }
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
