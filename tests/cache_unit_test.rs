//! Unit tests for the cache stores.
//!
//! Run with: cargo test --test cache_unit_test

mod common;

use chrono::Duration;
use std::fs;
use std::path::PathBuf;

use common::{base_time, readings};
use sensor_dashboard::error::AppError;
use sensor_dashboard::services::{CacheEntry, CacheStore, FileCacheStore, MemoryCacheStore};

/// Fresh per-test directory under the system temp dir.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "sensor-dashboard-{name}-{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn entry_age_is_measured_from_stored_timestamp() {
    let entry = CacheEntry::new(readings(&["A"], 0, 2), base_time());
    assert_eq!(entry.stored_at(), Some(base_time()));
    assert_eq!(
        entry.age(base_time() + Duration::milliseconds(59_999)),
        Duration::milliseconds(59_999)
    );
}

#[test]
fn entry_serializes_with_data_and_timestamp() {
    let entry = CacheEntry::new(Vec::new(), base_time());
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["data"], serde_json::json!([]));
    assert_eq!(json["timestamp"], base_time().timestamp_millis());
}

#[test]
fn file_store_round_trips_and_overwrites() {
    let dir = scratch_dir("round-trip");
    let store = FileCacheStore::new(&dir, 1024 * 1024);

    assert!(store.read("sensor_data_cache").is_none());

    let first = CacheEntry::new(readings(&["A", "B"], 0, 4), base_time());
    store.write("sensor_data_cache", &first).unwrap();
    assert_eq!(store.read("sensor_data_cache"), Some(first));

    let second = CacheEntry::new(readings(&["C"], 10, 1), base_time());
    store.write("sensor_data_cache", &second).unwrap();
    assert_eq!(store.read("sensor_data_cache"), Some(second));

    // No temporary files left behind
    let files: Vec<_> = fs::read_dir(&dir).unwrap().collect();
    assert_eq!(files.len(), 1);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn file_store_treats_corrupt_file_as_miss() {
    let dir = scratch_dir("corrupt");
    let store = FileCacheStore::new(&dir, 1024 * 1024);
    fs::create_dir_all(&dir).unwrap();
    fs::write(store.path_for("sensor_data_cache"), b"{\"data\": [oops").unwrap();

    assert!(store.read("sensor_data_cache").is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn file_store_rejects_entries_over_quota() {
    let dir = scratch_dir("quota");
    let store = FileCacheStore::new(&dir, 64);
    let entry = CacheEntry::new(readings(&["A"], 0, 10), base_time());

    assert!(matches!(
        store.write("sensor_data_cache", &entry),
        Err(AppError::Storage(_))
    ));
    assert!(store.read("sensor_data_cache").is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn file_keys_cannot_escape_the_directory() {
    let store = FileCacheStore::new("/var/cache/dash", 1024);
    assert_eq!(
        store.path_for("../../etc/passwd"),
        PathBuf::from("/var/cache/dash/______etc_passwd.json")
    );
    assert_eq!(
        store.path_for("sensor_data_cache"),
        PathBuf::from("/var/cache/dash/sensor_data_cache.json")
    );
}

#[test]
fn memory_store_round_trips_and_detects_corruption() {
    let store = MemoryCacheStore::new(1024 * 1024);
    let entry = CacheEntry::new(readings(&["A"], 0, 3), base_time());

    store.write("k", &entry).unwrap();
    assert_eq!(store.read("k"), Some(entry));

    store.insert_raw("k", b"not json".to_vec());
    assert!(store.read("k").is_none());

    store.remove("k");
    assert!(store.read("k").is_none());
}

#[test]
fn memory_store_enforces_quota() {
    let store = MemoryCacheStore::new(16);
    let entry = CacheEntry::new(readings(&["A"], 0, 1), base_time());
    assert!(matches!(store.write("k", &entry), Err(AppError::Storage(_))));
}
