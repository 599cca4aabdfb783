use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::KeyValueStore;

/// Store key for the parking locations snapshot.
pub const PARKING_LOCATIONS_KEY: &str = "parking_locations";

/// Store key for the app config snapshot.
pub const APP_CONFIG_KEY: &str = "app_config";

/// A persisted snapshot. Always written as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry<T> {
    pub data: T,
    /// Epoch milliseconds at which the snapshot was fetched.
    pub timestamp: i64,
    pub version: String,
}

impl<T> CachedEntry<T> {
    pub fn new(data: T, version: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            data,
            timestamp: now.timestamp_millis(),
            version: version.into(),
        }
    }

    /// Age in milliseconds. Clamped at zero when the clock has gone backwards.
    pub fn age_ms(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from(now.timestamp_millis() - self.timestamp).unwrap_or(0)
    }

    /// True while the entry is younger than `expiry`.
    pub fn is_valid(&self, expiry: Duration, now: DateTime<Utc>) -> bool {
        u128::from(self.age_ms(now)) < expiry.as_millis()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_ms(now) / 60_000;
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                // Round up: 1h 30m+ becomes 2h
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Reads and writes `CachedEntry` values through a `KeyValueStore`.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn KeyValueStore>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CachedEntry<T>>> {
        let Some(contents) = self.store.get(key)? else {
            return Ok(None);
        };

        let entry: CachedEntry<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache entry: {}", key))?;

        Ok(Some(entry))
    }

    pub fn save<T: Serialize>(&self, key: &str, entry: &CachedEntry<T>) -> Result<()> {
        let contents = serde_json::to_string(entry)
            .with_context(|| format!("Failed to serialize cache entry: {}", key))?;
        self.store.set(key, &contents)
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        self.store.remove(key)
    }

    /// Helper to load cache and log errors without failing
    fn load_age<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<String> {
        match self.load::<T>(key) {
            Ok(Some(entry)) => Some(entry.age_display(now)),
            Ok(None) => None,
            Err(e) => {
                debug!(cache = key, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    pub fn cache_status(&self, now: DateTime<Utc>) -> CacheStatus {
        CacheStatus {
            locations: self.load_age::<serde_json::Value>(PARKING_LOCATIONS_KEY, now),
            config: self.load_age::<serde_json::Value>(APP_CONFIG_KEY, now),
        }
    }
}

/// Human-readable age of each cached resource, `None` when absent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub locations: Option<String>,
    pub config: Option<String>,
}

impl CacheStatus {
    pub fn locations_age(&self) -> String {
        self.locations.clone().unwrap_or_else(|| "never".to_string())
    }

    pub fn config_age(&self) -> String {
        self.config.clone().unwrap_or_else(|| "never".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
