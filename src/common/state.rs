use std::sync::Arc;

use crate::api::DashboardClient;
use crate::common::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::services::cache::{CacheStore, FileCacheStore, MemoryCacheStore};
use crate::services::PredictionsFeed;
use crate::sync::controller::{ControllerSettings, FetchController};
use crate::sync::ViewportTrigger;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: Arc<DashboardClient>,
    pub controller: Arc<FetchController>,
    pub viewport: ViewportTrigger,
    pub predictions: Arc<PredictionsFeed>,
}

impl AppState {
    pub fn new(config: Config, client: DashboardClient) -> Self {
        let cache: Arc<dyn CacheStore> = match &config.cache_dir {
            Some(dir) => Arc::new(FileCacheStore::new(dir, config.cache_max_bytes)),
            None => Arc::new(MemoryCacheStore::new(config.cache_max_bytes)),
        };
        Self::with_parts(config, client, cache, Arc::new(SystemClock))
    }

    /// Build the state from explicit parts, e.g. an in-memory cache and a
    /// manual clock.
    pub fn with_parts(
        config: Config,
        client: DashboardClient,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let client = Arc::new(client);
        let controller = FetchController::new(
            client.clone(),
            cache,
            clock.clone(),
            ControllerSettings::from_config(&config),
        );
        let predictions = PredictionsFeed::new(client.clone(), clock);

        Self {
            config: Arc::new(config),
            client,
            controller: Arc::new(controller),
            viewport: ViewportTrigger::new(),
            predictions: Arc::new(predictions),
        }
    }
}
