use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use utoipa::ToSchema;

use crate::api::models::PredictionsResponse;
use crate::api::DashboardClient;
use crate::common::clock::Clock;

/// What the predictions panel shows.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PredictionsState {
    /// Last payload received; kept when a later refresh fails
    pub payload: Option<PredictionsResponse>,
    pub error: Option<String>,
    pub loading: bool,
    pub last_fetch_at: Option<DateTime<Utc>>,
}

/// Read-only holder of the latest prediction payload.
pub struct PredictionsFeed {
    client: Arc<DashboardClient>,
    clock: Arc<dyn Clock>,
    state: Mutex<PredictionsState>,
}

impl PredictionsFeed {
    #[must_use]
    pub fn new(client: Arc<DashboardClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            clock,
            state: Mutex::new(PredictionsState::default()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> PredictionsState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Fetch the latest predictions. Skipped while a fetch is already running.
    pub async fn refresh(&self) -> PredictionsState {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.loading {
                return state.clone();
            }
            state.loading = true;
        }

        let result = self.client.get_predictions().await;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.loading = false;
        match result {
            Ok(payload) => {
                tracing::debug!(
                    groups = payload.groups.as_ref().map_or(0, Vec::len),
                    "predictions_refreshed"
                );
                state.payload = Some(payload);
                state.error = None;
                state.last_fetch_at = Some(self.clock.now());
            }
            Err(e) => {
                tracing::warn!(error = %e, "predictions_refresh_failed");
                state.error = Some(e.to_string());
            }
        }
        state.clone()
    }
}
