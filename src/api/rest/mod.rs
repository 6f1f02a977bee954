pub mod photos;
pub mod rounds;
pub mod uploads;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

const ENVELOPE_BYTES: u64 = 64 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = body_limit(state.max_upload_bytes);

    Router::new()
        .merge(photos::router())
        .merge(rounds::router())
        .merge(uploads::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
}

fn body_limit(max_upload_bytes: u64) -> usize {
    let base64_len = max_upload_bytes.saturating_add(2) / 3 * 4;
    usize::try_from(base64_len.saturating_add(ENVELOPE_BYTES)).unwrap_or(usize::MAX)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    photos: usize,
    completed_photos: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        photos: state.photos.len(),
        completed_photos: state.photos.completed(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
