pub mod health;
pub mod predictions;
pub mod readings;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        readings::get_readings,
        readings::list_machines,
        readings::get_status,
        readings::refresh,
        readings::report_viewport,
        predictions::get_predictions,
        predictions::refresh_predictions,
        upload::upload_csv,
    ),
    components(
        schemas(
            crate::api::models::SensorReading,
            crate::api::models::PredictionsResponse,
            crate::api::models::UploadReceipt,
            crate::sync::controller::FetchState,
            crate::sync::controller::FetchOutcome,
            crate::services::predictions::PredictionsState,
            readings::ReadingsView,
            readings::StatusResponse,
            readings::ViewportReport,
            readings::ViewportResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "readings", description = "Sensor readings view and sync control"),
        (name = "predictions", description = "Maintenance predictions"),
        (name = "upload", description = "CSV dataset upload"),
    ),
    info(
        title = "Sensor Dashboard API",
        description = "View model for the predictive maintenance dashboard",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.upload_max_bytes;

    let view_routes = Router::new()
        .route("/readings", get(readings::get_readings))
        .route("/machines", get(readings::list_machines))
        .route("/status", get(readings::get_status))
        .route("/refresh", post(readings::refresh))
        .route("/viewport", post(readings::report_viewport))
        .route("/predictions", get(predictions::get_predictions))
        .route("/predictions/refresh", post(predictions::refresh_predictions))
        .layer(RequestBodyLimitLayer::new(64 * 1024));

    let upload_routes = Router::new()
        .route("/upload", post(upload::upload_csv))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(RequestBodyLimitLayer::new(upload_limit));

    // Health check routes
    let health_routes = Router::new().route("/healthz", get(health::healthz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .nest("/api", view_routes.merge(upload_routes))
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
