use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;

use crate::engine::scoring::score_round;
use crate::error::AppError;
use crate::models::round::{RoundResult, RoundSubmission};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/rounds/score", post(score))
}

async fn score(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RoundSubmission>, JsonRejection>,
) -> Result<Json<RoundResult>, AppError> {
    let Json(payload) = payload?;
    let result = score_round(&payload, &state.scoring)?;

    state.metrics.rounds_scored_total.inc();
    state.metrics.round_score.observe(f64::from(result.score));

    Ok(Json(result))
}
