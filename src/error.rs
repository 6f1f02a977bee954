use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::engine::scoring::ScoringError;
use crate::engine::upload::UploadFailure;
use crate::store::memory::PhotoRecordError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("upstream failure: {0}")]
    Upstream(UploadFailure),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<UploadFailure> for AppError {
    fn from(failure: UploadFailure) -> Self {
        AppError::Upstream(failure)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<PhotoRecordError> for AppError {
    fn from(err: PhotoRecordError) -> Self {
        match err {
            PhotoRecordError::NotFound(_) => AppError::NotFound(err.to_string()),
            PhotoRecordError::AlreadyFinalized(_) => AppError::Conflict(err.to_string()),
            PhotoRecordError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": msg }))
            }
            // The caller needs the step and any orphaned record to clean up.
            AppError::Upstream(failure) => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "error": failure.reason(),
                    "step": failure.step.label(),
                    "kind": failure.kind,
                    "photoId": failure.photo_id,
                }),
            ),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };

        (status, Json(body)).into_response()
    }
}
