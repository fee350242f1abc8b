//! Mapping of application errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use diary_core::entry::EntryError;
use diary_shared::AppError;

/// Error returned by handlers.
///
/// Storage rejections are passed through as plain text with the storage
/// service's own status. Everything else is JSON
/// `{"error": <code>, "message": <text>}`, with database and internal
/// details logged instead of returned.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<EntryError> for ApiError {
    fn from(err: EntryError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.0.error_code().to_ascii_lowercase();

        match self.0 {
            AppError::Upstream { status: upstream, body } => {
                warn!(status = upstream, body = %body, "Storage service rejected request");
                (status, body).into_response()
            }
            err if err.is_internal() => {
                error!(error = %err, "Request failed");
                (
                    status,
                    Json(json!({ "error": code, "message": "An error occurred" })),
                )
                    .into_response()
            }
            AppError::ExternalService(message) => {
                error!(error = %message, "External service failed");
                (
                    status,
                    Json(json!({ "error": code, "message": "Storage operation failed" })),
                )
                    .into_response()
            }
            err => (status, Json(json!({ "error": code, "message": err.to_string() }))).into_response(),
        }
    }
}
