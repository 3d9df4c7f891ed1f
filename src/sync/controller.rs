//! Fetch controller: the single owner of the dashboard's reading set.
//!
//! Every state change goes through [`FetchController::request_refresh`],
//! [`FetchController::force_refresh`] or [`FetchController::request_next_page`].
//! Each operation checks and sets `phase` under the state lock before its
//! first await, so at most one request is in flight per controller.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use utoipa::ToSchema;

use crate::api::gateway::FetchGateway;
use crate::api::models::SensorReading;
use crate::common::clock::Clock;
use crate::config::Config;
use crate::services::cache::{CacheEntry, CacheStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
    Error(String),
}

impl Phase {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FetchState {
    pub phase: Phase,
    /// Index of the last page merged into the reading set
    pub page: usize,
    pub has_more: bool,
    /// Start time of the last successful page-0 fetch
    pub last_fetch_at: Option<DateTime<Utc>>,
}

impl Default for FetchState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            page: 0,
            has_more: true,
            last_fetch_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InFlight,
    Throttled,
    NoMoreData,
    /// No page-0 snapshot has been adopted yet, so there is nothing to extend
    NotLoaded,
    TornDown,
}

/// What a fetch operation ended up doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Skipped { reason: SkipReason },
    CacheHit { rows: usize },
    Fetched { page: usize, rows: usize },
    Failed { message: String },
    /// The view was torn down while the request was in flight
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
    CacheFirst,
    Bypass,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub page_size: usize,
    pub cache_key: String,
    pub cache_ttl: Duration,
    pub min_refresh_interval: Duration,
}

impl ControllerSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            cache_key: config.cache_key.clone(),
            cache_ttl: millis(config.cache_ttl_ms),
            min_refresh_interval: millis(config.min_refresh_interval_ms),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

/// Point-in-time copy of the controller state for renderers.
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub state: FetchState,
    pub readings: Arc<Vec<SensorReading>>,
}

struct ControllerState {
    fetch: FetchState,
    readings: Arc<Vec<SensorReading>>,
    /// Set once page 0 has landed, from the network or the cache
    loaded: bool,
    alive: bool,
}

pub struct FetchController {
    gateway: Arc<dyn FetchGateway>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    settings: ControllerSettings,
    inner: Mutex<ControllerState>,
}

impl FetchController {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn FetchGateway>,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            gateway,
            cache,
            clock,
            settings,
            inner: Mutex::new(ControllerState {
                fetch: FetchState::default(),
                readings: Arc::new(Vec::new()),
                loaded: false,
                alive: true,
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        // No await ever happens under this lock, so a poisoned guard still
        // holds a consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn fetch_state(&self) -> FetchState {
        self.state().fetch.clone()
    }

    #[must_use]
    pub fn readings(&self) -> Arc<Vec<SensorReading>> {
        Arc::clone(&self.state().readings)
    }

    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        let state = self.state();
        ControllerSnapshot {
            state: state.fetch.clone(),
            readings: Arc::clone(&state.readings),
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state().alive
    }

    /// Mark the controller torn down. Results still in flight are dropped on
    /// arrival and later requests are skipped.
    pub fn shutdown(&self) {
        self.state().alive = false;
        tracing::debug!("fetch_controller_shutdown");
    }

    /// Page-0 refresh, cache first. Used on mount and by the poller.
    pub async fn request_refresh(&self) -> FetchOutcome {
        self.refresh(RefreshMode::CacheFirst).await
    }

    /// Page-0 refresh that skips the throttle and the cache read.
    ///
    /// Still refuses to start while another request is in flight.
    pub async fn force_refresh(&self) -> FetchOutcome {
        self.refresh(RefreshMode::Bypass).await
    }

    async fn refresh(&self, mode: RefreshMode) -> FetchOutcome {
        let started_at = self.clock.now();
        let page_size = self.settings.page_size;

        let blocked = self.refresh_blocked(&self.state(), mode, started_at);
        if let Some(reason) = blocked {
            return skipped(reason);
        }

        // Cache I/O happens outside the state lock; guards are re-checked after
        let cached = match mode {
            RefreshMode::CacheFirst => self.fresh_cache_entry(started_at),
            RefreshMode::Bypass => None,
        };

        {
            let mut state = self.state();
            if let Some(reason) = self.refresh_blocked(&state, mode, started_at) {
                return skipped(reason);
            }

            if let Some(entry) = cached {
                let rows = entry.data.len();
                state.fetch.has_more = rows == page_size;
                state.fetch.page = 0;
                state.fetch.phase = Phase::Idle;
                state.readings = Arc::new(entry.data);
                state.loaded = true;
                tracing::debug!(rows, "cache_hit");
                return FetchOutcome::CacheHit { rows };
            }

            state.fetch.phase = Phase::Loading;
        }

        let result = self.gateway.fetch_page(0, page_size).await;

        let entry = {
            let mut state = self.state();
            if !state.alive {
                tracing::debug!("refresh_result_discarded");
                return FetchOutcome::Discarded;
            }

            match result {
                Ok(page) => {
                    let rows = page.len();
                    state.fetch.has_more = page.is_full(page_size);
                    state.fetch.page = 0;
                    state.fetch.last_fetch_at = Some(started_at);
                    state.fetch.phase = Phase::Idle;
                    state.readings = Arc::new(page.readings);
                    state.loaded = true;
                    tracing::debug!(rows, has_more = state.fetch.has_more, "refresh_completed");
                    CacheEntry::new(state.readings.as_ref().clone(), self.clock.now())
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(error = %message, "refresh_failed");
                    state.fetch.phase = Phase::Error(message.clone());
                    return FetchOutcome::Failed { message };
                }
            }
        };

        let rows = entry.data.len();
        if let Err(e) = self.cache.write(&self.settings.cache_key, &entry) {
            tracing::warn!(error = %e, "cache_write_failed");
        }

        FetchOutcome::Fetched { page: 0, rows }
    }

    /// Fetch the page after the last merged one and append it.
    pub async fn request_next_page(&self) -> FetchOutcome {
        let page_size = self.settings.page_size;

        let next_page = {
            let mut state = self.state();
            if !state.alive {
                return skipped(SkipReason::TornDown);
            }
            if state.fetch.phase.is_loading() {
                return skipped(SkipReason::InFlight);
            }
            if !state.loaded {
                tracing::debug!("next_page_skipped_not_loaded");
                return skipped(SkipReason::NotLoaded);
            }
            if !state.fetch.has_more {
                return skipped(SkipReason::NoMoreData);
            }
            state.fetch.phase = Phase::Loading;
            state.fetch.page + 1
        };

        let offset = next_page * page_size;
        let result = self.gateway.fetch_page(offset, page_size).await;

        let mut state = self.state();
        if !state.alive {
            tracing::debug!(page = next_page, "next_page_result_discarded");
            return FetchOutcome::Discarded;
        }

        match result {
            Ok(page) => {
                let rows = page.len();
                if page.is_empty() {
                    tracing::debug!(page = next_page, offset, "next_page_empty");
                }
                state.fetch.has_more = page.is_full(page_size);
                state.fetch.page = next_page;
                state.fetch.phase = Phase::Idle;
                Arc::make_mut(&mut state.readings).extend(page.readings);
                tracing::debug!(
                    page = next_page,
                    offset,
                    rows,
                    total_rows = state.readings.len(),
                    has_more = state.fetch.has_more,
                    "next_page_appended"
                );
                FetchOutcome::Fetched {
                    page: next_page,
                    rows,
                }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(page = next_page, error = %message, "next_page_failed");
                state.fetch.phase = Phase::Error(message.clone());
                FetchOutcome::Failed { message }
            }
        }
    }

    fn refresh_blocked(
        &self,
        state: &ControllerState,
        mode: RefreshMode,
        now: DateTime<Utc>,
    ) -> Option<SkipReason> {
        if !state.alive {
            return Some(SkipReason::TornDown);
        }
        if state.fetch.phase.is_loading() {
            tracing::debug!("refresh_skipped_in_flight");
            return Some(SkipReason::InFlight);
        }
        if mode == RefreshMode::CacheFirst
            && let Some(last) = state.fetch.last_fetch_at
            && now - last < self.settings.min_refresh_interval
        {
            tracing::debug!(last_fetch_at = %last, "refresh_throttled");
            return Some(SkipReason::Throttled);
        }
        None
    }

    fn fresh_cache_entry(&self, now: DateTime<Utc>) -> Option<CacheEntry> {
        let entry = self.cache.read(&self.settings.cache_key)?;
        if entry.age(now) < self.settings.cache_ttl {
            Some(entry)
        } else {
            tracing::debug!(stored_at = ?entry.stored_at(), "cache_expired");
            None
        }
    }
}

fn skipped(reason: SkipReason) -> FetchOutcome {
    FetchOutcome::Skipped { reason }
}
