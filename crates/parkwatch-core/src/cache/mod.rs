//! Local caching module for offline data access.
//!
//! This module provides the `CacheManager` for persisting the last good
//! feed snapshot of each resource. Entries are JSON-serialized
//! `CachedEntry<T>` values held in a string key-value store:
//!
//! - `FileStore`: one file per key under the cache directory
//! - `MemoryStore`: process-local, used in tests and ephemeral runs

pub mod manager;
pub mod store;

pub use manager::{CacheManager, CacheStatus, CachedEntry, APP_CONFIG_KEY, PARKING_LOCATIONS_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
