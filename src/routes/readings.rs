use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::models::SensorReading;
use crate::common::AppState;
use crate::services::aggregate::{self, MachineSelection};
use crate::sync::controller::{FetchOutcome, FetchState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReadingsQuery {
    /// Machine id to show, or `all` (default)
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub machine: MachineSelection,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingsView {
    pub state: FetchState,
    /// Applied machine filter
    pub selection: String,
    /// Distinct machines across all loaded readings
    pub machines: Vec<String>,
    /// Rows loaded before filtering
    pub total_rows: usize,
    pub readings: Vec<SensorReading>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub state: FetchState,
    pub sentinel_visible: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ViewportReport {
    pub visible: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ViewportResponse {
    pub visible: bool,
    /// Whether this report moved the sentinel into view
    pub entered_view: bool,
}

/// Loaded readings, filtered by machine
#[utoipa::path(
    get,
    path = "/api/readings",
    params(ReadingsQuery),
    responses(
        (status = 200, description = "Current reading set", body = ReadingsView),
    ),
    tag = "readings"
)]
pub async fn get_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingsQuery>,
) -> Json<ReadingsView> {
    let snapshot = state.controller.snapshot();
    let readings = snapshot.readings.as_slice();

    Json(ReadingsView {
        selection: query.machine.to_string(),
        machines: aggregate::machines(readings).into_iter().collect(),
        total_rows: readings.len(),
        readings: aggregate::filter(readings, &query.machine).into_owned(),
        state: snapshot.state,
    })
}

/// Distinct machine ids in the loaded readings
#[utoipa::path(
    get,
    path = "/api/machines",
    responses(
        (status = 200, description = "Machine ids", body = Vec<String>),
    ),
    tag = "readings"
)]
pub async fn list_machines(State(state): State<AppState>) -> Json<Vec<String>> {
    let readings = state.controller.readings();
    Json(aggregate::machines(&readings).into_iter().collect())
}

/// Fetch state of the dashboard view
#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Fetch state", body = StatusResponse),
    ),
    tag = "readings"
)]
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        state: state.controller.fetch_state(),
        sentinel_visible: state.viewport.is_visible(),
    })
}

/// Manual reload of page 0, bypassing the local cache
#[utoipa::path(
    post,
    path = "/api/refresh",
    responses(
        (status = 200, description = "What the refresh did", body = FetchOutcome),
    ),
    tag = "readings"
)]
pub async fn refresh(State(state): State<AppState>) -> Json<FetchOutcome> {
    let outcome = state.controller.force_refresh().await;
    tracing::info!(?outcome, "Manual refresh");
    Json(outcome)
}

/// Report the pagination sentinel's visibility
#[utoipa::path(
    post,
    path = "/api/viewport",
    request_body = ViewportReport,
    responses(
        (status = 200, description = "Visibility recorded", body = ViewportResponse),
    ),
    tag = "readings"
)]
pub async fn report_viewport(
    State(state): State<AppState>,
    Json(report): Json<ViewportReport>,
) -> Json<ViewportResponse> {
    let entered_view = state.viewport.set_visible(report.visible);
    Json(ViewportResponse {
        visible: report.visible,
        entered_view,
    })
}
