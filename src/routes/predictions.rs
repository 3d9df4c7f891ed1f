use axum::{extract::State, Json};

use crate::common::AppState;
use crate::services::predictions::PredictionsState;

/// Latest maintenance predictions
#[utoipa::path(
    get,
    path = "/api/predictions",
    responses(
        (status = 200, description = "Predictions panel state", body = PredictionsState),
    ),
    tag = "predictions"
)]
pub async fn get_predictions(State(state): State<AppState>) -> Json<PredictionsState> {
    Json(state.predictions.snapshot())
}

/// Re-fetch predictions now
#[utoipa::path(
    post,
    path = "/api/predictions/refresh",
    responses(
        (status = 200, description = "Predictions panel state after refresh", body = PredictionsState),
    ),
    tag = "predictions"
)]
pub async fn refresh_predictions(State(state): State<AppState>) -> Json<PredictionsState> {
    Json(state.predictions.refresh().await)
}
