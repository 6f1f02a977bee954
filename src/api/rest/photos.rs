use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::Serialize;

use crate::error::AppError;
use crate::models::photo::{CreatePhotoRequest, PhotoId, PhotoSummary};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/photos", post(create_photo))
        .route("/photos/:id", get(get_photo))
        .route("/photos/:id/chunks/:index", put(put_chunk))
        .route("/photos/:id/finalize", post(finalize_photo))
}

#[derive(Serialize)]
pub struct CreatedPhoto {
    pub id: PhotoId,
}

async fn create_photo(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreatePhotoRequest>, JsonRejection>,
) -> Result<Json<CreatedPhoto>, AppError> {
    let Json(payload) = payload?;
    let id = state.photos.create(payload)?;
    Ok(Json(CreatedPhoto { id }))
}

async fn put_chunk(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(PhotoId, u64)>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    state.photos.put_chunk(id, index, &body)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn finalize_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PhotoId>,
) -> Result<Json<PhotoSummary>, AppError> {
    Ok(Json(state.photos.finalize(id)?))
}

async fn get_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PhotoId>,
) -> Result<Json<PhotoSummary>, AppError> {
    Ok(Json(state.photos.summary(id)?))
}
