//! Per-deployment application configuration served by the config feed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Coordinates;

/// Town branding shown by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    pub name: String,
    pub primary_color: String,
    pub secondary_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// Initial map viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSettings {
    pub center: Coordinates,
    pub zoom: f64,
}

/// Where parking data comes from and how often to poll it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceSettings {
    /// Polling interval in milliseconds.
    pub refresh_interval: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_data_url: Option<String>,
}

impl DataSourceSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub branding: Branding,
    pub map: MapSettings,
    pub data_source: DataSourceSettings,
}

/// Envelope returned by the config feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub config: AppConfig,
    pub version: String,
}
