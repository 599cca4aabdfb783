//! Cache-backed fetcher for the parking and config feeds.
//!
//! Produces the best validated snapshot available: a fresh cache entry, a
//! network response, or a stale cache entry, in that order of preference.
//! The two public operations never fail; the absence of any data is
//! reported as an empty list or `None`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, FeedSource};
use crate::cache::{CacheManager, CacheStatus, CachedEntry, APP_CONFIG_KEY, PARKING_LOCATIONS_KEY};
use crate::clock::Clock;
use crate::connectivity::ConnectivityProbe;
use crate::models::{AppConfig, ParkingLocation};
use crate::validation::{validate_config, validate_locations, ValidationError};

// ============================================================================
// Constants
// ============================================================================

/// How long a cached snapshot is served online without asking the network.
pub const DEFAULT_CACHE_EXPIRY: Duration = Duration::from_secs(5 * 60);

/// How old a cached snapshot may be before offline use is logged as degraded.
pub const DEFAULT_OFFLINE_CACHE_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on a single request, including body transfer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempts per fetch before falling back to the cache.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub locations_url: String,
    pub config_url: String,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub cache_expiry: Duration,
    pub offline_cache_expiry: Duration,
}

impl FetcherSettings {
    pub fn new(locations_url: impl Into<String>, config_url: impl Into<String>) -> Self {
        Self {
            locations_url: locations_url.into(),
            config_url: config_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            cache_expiry: DEFAULT_CACHE_EXPIRY,
            offline_cache_expiry: DEFAULT_OFFLINE_CACHE_EXPIRY,
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Payload rejected: {0}")]
    Invalid(#[from] ValidationError),

    #[error("All {attempts} attempts failed, last error: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

/// Validated payload plus the feed's version string.
type Validated<T> = (T, String);

/// One fetchable feed: where it lives, where it is cached, how it is checked.
struct Resource<'a, T> {
    name: &'static str,
    url: &'a str,
    cache_key: &'static str,
    validate: fn(Value) -> Result<Validated<T>, ValidationError>,
}

fn locations_payload(value: Value) -> Result<Validated<Vec<ParkingLocation>>, ValidationError> {
    let response = validate_locations(value)?;
    debug!(
        count = response.locations.len(),
        feed_updated = %response.last_updated,
        "Locations payload valid"
    );
    Ok((response.locations, response.version))
}

fn config_payload(value: Value) -> Result<Validated<AppConfig>, ValidationError> {
    let response = validate_config(value)?;
    Ok((response.config, response.version))
}

/// Sole owner of the cached feed snapshots.
pub struct DataFetcher {
    source: Arc<dyn FeedSource>,
    cache: CacheManager,
    connectivity: Arc<dyn ConnectivityProbe>,
    clock: Arc<dyn Clock>,
    settings: FetcherSettings,
}

impl DataFetcher {
    pub fn new(
        source: Arc<dyn FeedSource>,
        cache: CacheManager,
        connectivity: Arc<dyn ConnectivityProbe>,
        clock: Arc<dyn Clock>,
        settings: FetcherSettings,
    ) -> Self {
        Self {
            source,
            cache,
            connectivity,
            clock,
            settings,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current parking locations, or an empty list when nothing is available.
    pub async fn fetch_parking_locations(&self) -> Vec<ParkingLocation> {
        self.fetch_resource(Resource {
            name: "locations",
            url: &self.settings.locations_url,
            cache_key: PARKING_LOCATIONS_KEY,
            validate: locations_payload,
        })
        .await
        .unwrap_or_default()
    }

    /// Current app config, or `None` when nothing is available.
    pub async fn fetch_app_config(&self) -> Option<AppConfig> {
        self.fetch_resource(Resource {
            name: "config",
            url: &self.settings.config_url,
            cache_key: APP_CONFIG_KEY,
            validate: config_payload,
        })
        .await
    }

    /// Drop both cached snapshots.
    pub fn clear_cache(&self) -> anyhow::Result<()> {
        self.cache.clear(PARKING_LOCATIONS_KEY)?;
        self.cache.clear(APP_CONFIG_KEY)?;
        info!("Cache cleared");
        Ok(())
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.cache.cache_status(self.clock.now())
    }

    async fn fetch_resource<T>(&self, resource: Resource<'_, T>) -> Option<T>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        let name = resource.name;
        let cached = self.load_cached::<T>(resource.cache_key);
        let now = self.clock.now();

        if !self.connectivity.is_online() {
            let Some(entry) = cached else {
                warn!(resource = name, "Offline with no cached data");
                return None;
            };
            let age_ms = entry.age_ms(now);
            if entry.is_valid(self.settings.cache_expiry, now) {
                debug!(resource = name, age_ms, "Offline, serving fresh cache");
            } else if entry.is_valid(self.settings.offline_cache_expiry, now) {
                info!(resource = name, age_ms, "Offline, serving stale cache within offline window");
            } else {
                warn!(resource = name, age_ms, "Offline, serving cache beyond offline window");
            }
            return Some(entry.data);
        }

        if cached
            .as_ref()
            .is_some_and(|entry| entry.is_valid(self.settings.cache_expiry, now))
        {
            debug!(resource = name, "Cache hit, skipping network");
            return cached.map(|entry| entry.data);
        }

        match self.fetch_with_retry(resource.url, resource.validate).await {
            Ok((data, version)) => {
                let entry = CachedEntry::new(data, version, self.clock.now());
                if let Err(e) = self.cache.save(resource.cache_key, &entry) {
                    warn!(resource = name, error = %e, "Failed to write cache");
                }
                info!(resource = name, version = %entry.version, "Fetched fresh data");
                Some(entry.data)
            }
            Err(e) => {
                warn!(resource = name, url = resource.url, error = %e, "Fetch failed");
                match cached {
                    Some(entry) => {
                        info!(
                            resource = name,
                            age_ms = entry.age_ms(now),
                            "Falling back to cached data"
                        );
                        Some(entry.data)
                    }
                    None => {
                        warn!(resource = name, "No cached data to fall back to");
                        None
                    }
                }
            }
        }
    }

    /// Unreadable entries are treated as missing.
    fn load_cached<T: DeserializeOwned>(&self, key: &str) -> Option<CachedEntry<T>> {
        match self.cache.load(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(cache = key, error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    async fn fetch_with_retry<T>(
        &self,
        url: &str,
        validate: fn(Value) -> Result<Validated<T>, ValidationError>,
    ) -> Result<Validated<T>, FetchError> {
        let attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match self.attempt(url, validate).await {
                Ok(validated) => {
                    if attempt > 1 {
                        info!(url = url, attempt, "Fetch succeeded after retry");
                    }
                    return Ok(validated);
                }
                Err(e) => e,
            };

            warn!(url = url, attempt, max_attempts = attempts, error = %err, "Fetch attempt failed");
            if attempt >= attempts {
                return Err(FetchError::Exhausted {
                    attempts,
                    last: Box::new(err),
                });
            }

            attempt += 1;
            tokio::time::sleep(self.settings.retry_delay).await;
        }
    }

    /// A single request. An invalid payload fails the attempt like a
    /// network error does.
    async fn attempt<T>(
        &self,
        url: &str,
        validate: fn(Value) -> Result<Validated<T>, ValidationError>,
    ) -> Result<Validated<T>, FetchError> {
        let timeout = self.settings.request_timeout;
        let value = tokio::time::timeout(timeout, self.source.fetch_json(url))
            .await
            .map_err(|_| ApiError::Timeout(timeout))??;

        Ok(validate(value)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
