//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use sensor_dashboard::api::models::{Page, SensorReading};
use sensor_dashboard::api::FetchGateway;
use sensor_dashboard::common::ManualClock;
use sensor_dashboard::error::{AppError, AppResult};
use sensor_dashboard::services::MemoryCacheStore;
use sensor_dashboard::sync::controller::{ControllerSettings, FetchController};

pub const PAGE_SIZE: usize = 1000;
pub const TTL_MS: i64 = 60_000;
pub const CACHE_KEY: &str = "sensor_data_cache";

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

pub fn reading(machine_id: &str, seq: i64) -> SensorReading {
    SensorReading {
        machine_id: machine_id.to_string(),
        timestamp: base_time() - Duration::seconds(seq),
        temperature: 60.0 + (seq % 10) as f64,
        vibration: 0.1 * (seq % 5) as f64,
        energy_consumption: 100.0 + seq as f64,
    }
}

/// `count` readings cycling over `machines`, numbered from `start`.
pub fn readings(machines: &[&str], start: i64, count: usize) -> Vec<SensorReading> {
    (0..count)
        .map(|i| {
            let seq = start + i as i64;
            reading(machines[i % machines.len()], seq)
        })
        .collect()
}

pub fn page(machines: &[&str], start: i64, count: usize) -> Page {
    Page::new(readings(machines, start, count))
}

/// Gateway that replays queued responses and records every call.
///
/// When gated, each call waits for [`ScriptedGateway::release`] before
/// answering, which keeps a request observably in flight.
#[derive(Default)]
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<AppResult<Page>>>,
    calls: Mutex<Vec<(usize, usize)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    gate: Option<Semaphore>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn push_page(&self, page: Page) {
        self.responses.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(AppError::Network(message.to_string())));
    }

    /// Let one gated call complete.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchGateway for ScriptedGateway {
    async fn fetch_page(&self, offset: usize, limit: usize) -> AppResult<Page> {
        self.calls.lock().unwrap().push((offset, limit));
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Page::default()))
    }
}

pub fn settings() -> ControllerSettings {
    ControllerSettings {
        page_size: PAGE_SIZE,
        cache_key: CACHE_KEY.to_string(),
        cache_ttl: Duration::milliseconds(TTL_MS),
        min_refresh_interval: Duration::milliseconds(60_000),
    }
}

pub struct Harness {
    pub gateway: Arc<ScriptedGateway>,
    pub cache: Arc<MemoryCacheStore>,
    pub clock: Arc<ManualClock>,
    pub controller: Arc<FetchController>,
}

impl Harness {
    pub fn new(gateway: ScriptedGateway) -> Self {
        Self::with_cache(gateway, MemoryCacheStore::new(10 * 1024 * 1024))
    }

    pub fn with_cache(gateway: ScriptedGateway, cache: MemoryCacheStore) -> Self {
        let gateway = Arc::new(gateway);
        let cache = Arc::new(cache);
        let clock = Arc::new(ManualClock::at_millis(0));
        let controller = Arc::new(FetchController::new(
            gateway.clone(),
            cache.clone(),
            clock.clone(),
            settings(),
        ));
        Self {
            gateway,
            cache,
            clock,
            controller,
        }
    }
}
