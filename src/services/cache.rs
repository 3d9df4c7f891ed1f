//! Best-effort local cache for the page-0 sensor snapshot.
//!
//! The cache is a dumb blob store: it persists one [`CacheEntry`] per key and
//! knows nothing about freshness. Expiry is decided by the fetch controller,
//! which compares [`CacheEntry::age`] against its TTL.
//!
//! # Backends
//!
//! | Backend | Storage | Used for |
//! |---------|---------|----------|
//! | [`FileCacheStore`] | one JSON file per key | the running dashboard |
//! | [`MemoryCacheStore`] | moka cache of serialized bytes | tests, `CACHE_DIR=""` |
//!
//! # Failure policy
//!
//! - `read` never fails: a missing or undecodable entry is a cache miss.
//! - `write` returns `AppError::Storage` on quota, serialization or I/O
//!   failure; callers log it and carry on as if nothing was cached.
//!
//! # Layout
//!
//! ```text
//! { "data": [SensorReading, ...], "timestamp": <epoch-ms> }
//! ```

use chrono::{DateTime, Duration, Utc};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::models::SensorReading;
use crate::error::{AppError, AppResult};

/// Snapshot of the reading set with the time it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Vec<SensorReading>,
    /// Epoch milliseconds
    #[serde(rename = "timestamp")]
    pub stored_at_ms: i64,
}

impl CacheEntry {
    #[must_use]
    pub fn new(data: Vec<SensorReading>, stored_at: DateTime<Utc>) -> Self {
        Self {
            data,
            stored_at_ms: stored_at.timestamp_millis(),
        }
    }

    #[must_use]
    pub fn stored_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.stored_at_ms)
    }

    /// Time elapsed since the entry was stored.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        Duration::milliseconds(now.timestamp_millis() - self.stored_at_ms)
    }
}

/// Key/value persistence for cache entries.
pub trait CacheStore: Send + Sync {
    /// Load the entry for `key`; `None` when absent or corrupt.
    fn read(&self, key: &str) -> Option<CacheEntry>;

    /// Store `entry` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` on quota, serialization or I/O failure.
    fn write(&self, key: &str, entry: &CacheEntry) -> AppResult<()>;
}

fn encode(entry: &CacheEntry, max_bytes: u64) -> AppResult<Vec<u8>> {
    let bytes = serde_json::to_vec(entry)
        .map_err(|e| AppError::Storage(format!("Failed to serialize entry: {e}")))?;

    if bytes.len() as u64 > max_bytes {
        return Err(AppError::Storage(format!(
            "Quota exceeded: entry is {} bytes, limit is {max_bytes}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn decode(key: &str, bytes: &[u8]) -> Option<CacheEntry> {
    match serde_json::from_slice(bytes) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::debug!(cache_key = %key, error = %e, "cache_corrupt");
            None
        }
    }
}

/// Cache persisted as `<dir>/<key>.json`.
///
/// Writes land in a temporary file that is renamed over the target, so a
/// concurrent reader sees either the old or the new entry, never a torn one.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
    max_bytes: u64,
}

impl FileCacheStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    /// Keys are reduced to `[A-Za-z0-9_-]` so they cannot escape the directory.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_stem}.json"))
    }
}

impl CacheStore for FileCacheStore {
    fn read(&self, key: &str) -> Option<CacheEntry> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cache_read_failed");
                return None;
            }
        };
        decode(key, &bytes)
    }

    fn write(&self, key: &str, entry: &CacheEntry) -> AppResult<()> {
        let bytes = encode(entry, self.max_bytes)?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::Storage(format!("Failed to create {}: {e}", self.dir.display()))
        })?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));

        fs::write(&tmp_path, &bytes)
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {e}", tmp_path.display())))?;

        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(AppError::Storage(format!(
                "Failed to replace {}: {e}",
                path.display()
            )));
        }

        tracing::debug!(
            cache_key = %key,
            size_bytes = bytes.len(),
            rows = entry.data.len(),
            "cache_stored"
        );
        Ok(())
    }
}

/// In-process cache of serialized entries.
///
/// Entries are kept as bytes so that decoding behaves exactly like the file
/// backend. Weighted by byte size to enforce the same quota.
#[derive(Clone)]
pub struct MemoryCacheStore {
    entries: Cache<String, Arc<Vec<u8>>>,
    max_bytes: u64,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        // Cache weighted by byte size, not entry count
        let entries = Cache::builder()
            .weigher(|_key: &String, value: &Arc<Vec<u8>>| -> u32 {
                value.len().try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_bytes)
            .build();

        Self { entries, max_bytes }
    }

    /// Store raw bytes under `key`, bypassing serialization.
    pub fn insert_raw(&self, key: &str, bytes: Vec<u8>) {
        self.entries.insert(key.to_string(), Arc::new(bytes));
    }

    pub fn remove(&self, key: &str) {
        self.entries.invalidate(key);
    }
}

impl CacheStore for MemoryCacheStore {
    fn read(&self, key: &str) -> Option<CacheEntry> {
        let bytes = self.entries.get(key)?;
        decode(key, &bytes)
    }

    fn write(&self, key: &str, entry: &CacheEntry) -> AppResult<()> {
        let bytes = encode(entry, self.max_bytes)?;
        let size = bytes.len();
        self.entries.insert(key.to_string(), Arc::new(bytes));

        tracing::debug!(cache_key = %key, size_bytes = size, "cache_stored");
        Ok(())
    }
}
