//! Mapping of [`AppError`] onto HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::AppError;

/// Body of every error response: `{"error": {"code", "message"}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ApiError,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Wrapper to make AppError usable as an axum error response.
#[derive(Debug)]
pub struct ApiErr(pub AppError);

impl ApiErr {
    /// Status code and machine-readable code for the wrapped error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AppError::TeamExists { .. } => (StatusCode::BAD_REQUEST, "TEAM_EXISTS"),
            AppError::PullRequestExists { .. } => (StatusCode::CONFLICT, "PR_EXISTS"),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::PullRequestMerged { .. } => (StatusCode::CONFLICT, "PR_MERGED"),
            AppError::NotAssigned { .. } => (StatusCode::CONFLICT, "NOT_ASSIGNED"),
            AppError::NoCandidate { .. } => (StatusCode::CONFLICT, "NO_CANDIDATE"),
            AppError::ConcurrentUpdate { .. } => (StatusCode::CONFLICT, "CONCURRENT_UPDATE"),
            AppError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            AppError::Database { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never leak store internals to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "unknown error".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(ErrorBody {
                error: ApiError {
                    code: code.to_string(),
                    message,
                },
            }),
        )
            .into_response()
    }
}

impl From<AppError> for ApiErr {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiErr {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::invalid_input(format!(
            "invalid json: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for ApiErr {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::invalid_input(rejection.body_text()))
    }
}
