use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::sync::controller::{FetchController, FetchOutcome};
use crate::sync::scheduler::{PollScheduler, SchedulerPhase};
use crate::sync::viewport::{self, ViewportTrigger};

/// Lifecycle owner of one dashboard view.
///
/// Mounting performs the initial cache-first refresh, starts the poller and
/// the viewport listener. Dismounting releases all three.
pub struct DashboardView {
    controller: Arc<FetchController>,
    viewport: ViewportTrigger,
    poll_interval: Duration,
    poller: PollScheduler,
    pagination: Option<JoinHandle<()>>,
}

impl DashboardView {
    #[must_use]
    pub fn new(
        controller: Arc<FetchController>,
        viewport: ViewportTrigger,
        poll_interval: Duration,
    ) -> Self {
        Self {
            controller,
            viewport,
            poll_interval,
            poller: PollScheduler::new("sensor_data"),
            pagination: None,
        }
    }

    #[must_use]
    pub fn poller_phase(&self) -> SchedulerPhase {
        self.poller.phase()
    }

    /// Must be called from within a tokio runtime.
    pub async fn mount(&mut self) -> FetchOutcome {
        let outcome = self.controller.request_refresh().await;
        tracing::info!(?outcome, "Dashboard view mounted");

        let controller = Arc::clone(&self.controller);
        self.poller.start(self.poll_interval, move || {
            let controller = Arc::clone(&controller);
            async move {
                let outcome = controller.request_refresh().await;
                tracing::debug!(?outcome, "poll_refresh");
            }
        });

        if let Some(previous) = self.pagination.take() {
            previous.abort();
        }
        self.pagination = Some(tokio::spawn(viewport::run_pagination(
            Arc::clone(&self.controller),
            self.viewport.subscribe(),
        )));

        outcome
    }

    pub fn dismount(&mut self) {
        self.poller.stop();
        if let Some(pagination) = self.pagination.take() {
            pagination.abort();
        }
        self.controller.shutdown();
        tracing::info!("Dashboard view dismounted");
    }
}

impl Drop for DashboardView {
    fn drop(&mut self) {
        if let Some(pagination) = self.pagination.take() {
            pagination.abort();
        }
    }
}
