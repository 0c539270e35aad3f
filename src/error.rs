use crate::models::descriptor::ValidationError;
use crate::services::filesystem_service::FilesystemError;
use crate::watch::service::WatchStartError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    #[error(transparent)]
    Watch(#[from] WatchStartError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Status code and machine-readable error code for the response body
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(ValidationError::MissingCommand) => {
                (StatusCode::BAD_REQUEST, "missing_command")
            }
            AppError::Validation(ValidationError::MissingUrl) => {
                (StatusCode::BAD_REQUEST, "missing_url")
            }
            AppError::Filesystem(FilesystemError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            AppError::Filesystem(FilesystemError::PathTraversal(_)) => {
                (StatusCode::BAD_REQUEST, "path_traversal")
            }
            AppError::Filesystem(FilesystemError::NotAFile(_)) => {
                (StatusCode::BAD_REQUEST, "not_a_file")
            }
            AppError::Filesystem(FilesystemError::Io { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "filesystem_error")
            }
            AppError::Watch(WatchStartError::NotFound(_) | WatchStartError::NotADirectory(_)) => {
                (StatusCode::NOT_FOUND, "watch_root_unavailable")
            }
            AppError::Watch(WatchStartError::Io { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "watch_failed")
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.classify();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, code = error_code, "Request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
