pub mod aggregate;
pub mod cache;
pub mod predictions;
pub mod upload;

pub use cache::{CacheEntry, CacheStore, FileCacheStore, MemoryCacheStore};
pub use predictions::PredictionsFeed;
