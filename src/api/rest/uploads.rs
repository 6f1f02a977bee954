use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::engine::upload::{upload_photo_chunked, UploadOutcome};
use crate::error::AppError;
use crate::models::photo::{PhotoId, PhotoMetadata};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/uploads", post(upload))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    pub metadata: PhotoMetadata,
    pub image_base64: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub photo_id: PhotoId,
    pub size: usize,
}

async fn upload(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let Json(payload) = payload?;
    let image = STANDARD
        .decode(payload.image_base64.trim())
        .map_err(|err| AppError::BadRequest(format!("imageBase64 is not valid base64: {err}")))?;

    if image.len() as u64 > state.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "image is {} bytes, limit is {}",
            image.len(),
            state.max_upload_bytes
        )));
    }

    let start = Instant::now();
    let outcome = upload_photo_chunked(
        state.uploader.as_ref(),
        &image,
        &payload.metadata,
        state.upload_chunk_size,
    )
    .await;

    let label = match &outcome {
        UploadOutcome::Success(_) => "success",
        UploadOutcome::Failure(failure) => failure.step.label(),
    };
    state
        .metrics
        .upload_latency_seconds
        .with_label_values(&[label])
        .observe(start.elapsed().as_secs_f64());
    state.metrics.uploads_total.with_label_values(&[label]).inc();

    match outcome {
        UploadOutcome::Success(photo_id) => {
            state.metrics.upload_bytes_total.inc_by(image.len() as u64);
            Ok(Json(UploadResponse {
                photo_id,
                size: image.len(),
            }))
        }
        UploadOutcome::Failure(failure) => Err(failure.into()),
    }
}
