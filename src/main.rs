use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sensor_dashboard::api::DashboardClient;
use sensor_dashboard::common::AppState;
use sensor_dashboard::config::Config;
use sensor_dashboard::routes;
use sensor_dashboard::sync::{DashboardView, PollScheduler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sensor_dashboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting sensor-dashboard...");

    // Load configuration (fail-fast)
    let config = Config::from_env()?;
    tracing::info!(
        deployment = ?config.deployment,
        api_base_url = %config.api_base_url,
        page_size = config.page_size,
        poll_interval_ms = config.poll_interval_ms,
        cache_dir = ?config.cache_dir,
        "Configuration loaded"
    );

    let client = DashboardClient::new(&config)?;
    tracing::info!("Sensor data client initialized");

    let state = AppState::new(config.clone(), client);

    // Mount the dashboard view: cache-first load, poller, viewport listener
    let mut view = DashboardView::new(
        state.controller.clone(),
        state.viewport.clone(),
        config.poll_interval(),
    );
    view.mount().await;

    // Predictions panel: load now, then on its own slower cycle
    let predictions = Arc::clone(&state.predictions);
    predictions.refresh().await;
    let mut predictions_poller = PollScheduler::new("predictions");
    predictions_poller.start(config.predictions_interval(), move || {
        let predictions = Arc::clone(&predictions);
        async move {
            predictions.refresh().await;
        }
    });

    let app = routes::build_router(state);

    // Start server with graceful shutdown
    let addr = config.bind_address();
    tracing::info!(address = %addr, "Starting server");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    predictions_poller.stop();
    view.dismount();

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
