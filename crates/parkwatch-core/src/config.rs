//! Application settings management.
//!
//! Settings name the two feed URLs and tune the fetcher and scheduler.
//! They are stored at `~/.config/parkwatch/config.json`; every field has a
//! default, and `PARKWATCH_*` environment variables override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fetcher::{
    FetcherSettings, DEFAULT_CACHE_EXPIRY, DEFAULT_MAX_ATTEMPTS, DEFAULT_OFFLINE_CACHE_EXPIRY,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_DELAY,
};
use crate::validation::MIN_REFRESH_INTERVAL_MS;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "parkwatch";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Polling interval used until the config feed says otherwise.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub const ENV_LOCATIONS_URL: &str = "PARKWATCH_LOCATIONS_URL";
pub const ENV_CONFIG_URL: &str = "PARKWATCH_CONFIG_URL";
pub const ENV_REFRESH_INTERVAL_MS: &str = "PARKWATCH_REFRESH_INTERVAL_MS";
pub const ENV_CACHE_DIR: &str = "PARKWATCH_CACHE_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub locations_url: String,
    pub config_url: String,
    pub refresh_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub cache_expiry_ms: u64,
    pub offline_cache_expiry_ms: u64,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            locations_url: "http://localhost:8080/data/parking-data.json".to_string(),
            config_url: "http://localhost:8080/data/app-config.json".to_string(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL.as_millis() as u64,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            cache_expiry_ms: DEFAULT_CACHE_EXPIRY.as_millis() as u64,
            offline_cache_expiry_ms: DEFAULT_OFFLINE_CACHE_EXPIRY.as_millis() as u64,
            cache_dir: None,
        }
    }
}

impl Settings {
    /// Load from the user config file, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&Self::config_path()?)?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from `lookup`. Unparsable numbers are logged and skipped.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_LOCATIONS_URL) {
            self.locations_url = url;
        }
        if let Some(url) = lookup(ENV_CONFIG_URL) {
            self.config_url = url;
        }
        if let Some(raw) = lookup(ENV_REFRESH_INTERVAL_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.refresh_interval_ms = ms,
                Err(e) => warn!(var = ENV_REFRESH_INTERVAL_MS, value = %raw, error = %e, "Ignoring invalid override"),
            }
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Polling interval, held to the same floor the config feed must meet.
    pub fn refresh_interval(&self) -> Duration {
        if self.refresh_interval_ms < MIN_REFRESH_INTERVAL_MS {
            warn!(
                refresh_interval_ms = self.refresh_interval_ms,
                min_ms = MIN_REFRESH_INTERVAL_MS,
                "Configured refresh interval too short, using minimum"
            );
            return Duration::from_millis(MIN_REFRESH_INTERVAL_MS);
        }
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn fetcher_settings(&self) -> FetcherSettings {
        FetcherSettings {
            locations_url: self.locations_url.clone(),
            config_url: self.config_url.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            cache_expiry: Duration::from_millis(self.cache_expiry_ms),
            offline_cache_expiry: Duration::from_millis(self.offline_cache_expiry_ms),
        }
    }
}
