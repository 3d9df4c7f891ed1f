use axum::http::StatusCode;

/// Health check endpoint
///
/// Returns 200 OK while the process is serving. Upstream availability is not
/// checked; the dashboard keeps serving its last state when the data service
/// is down.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "health"
)]
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
