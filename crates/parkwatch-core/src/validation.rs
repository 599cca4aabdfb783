//! Structural validation of feed payloads.
//!
//! A feed response is an atomic snapshot: one bad record rejects the whole
//! payload. Nothing is repaired or filtered.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::models::{AppConfig, ConfigResponse, LocationsResponse, ParkingLocation};

/// Tile zoom levels accepted for the initial map view.
pub const ZOOM_RANGE: RangeInclusive<f64> = 0.0..=22.0;

/// Lowest polling interval a config feed may request, in milliseconds.
pub const MIN_REFRESH_INTERVAL_MS: u64 = 10_000;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Malformed {what}: {source}")]
    Shape {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Location {id:?}: {reason}")]
    Location { id: String, reason: String },

    #[error("Duplicate location id {0:?}")]
    DuplicateId(String),

    #[error("Invalid config: {0}")]
    Config(String),
}

fn parse<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<T, ValidationError> {
    serde_json::from_value(value).map_err(|source| ValidationError::Shape { what, source })
}

/// Validate a parking feed payload.
pub fn validate_locations(value: Value) -> Result<LocationsResponse, ValidationError> {
    let response: LocationsResponse = parse("locations payload", value)?;

    let mut seen = HashSet::with_capacity(response.locations.len());
    for location in &response.locations {
        check_location(location)?;
        if !seen.insert(location.id.as_str()) {
            return Err(ValidationError::DuplicateId(location.id.clone()));
        }
    }

    Ok(response)
}

fn check_location(location: &ParkingLocation) -> Result<(), ValidationError> {
    let fail = |reason: String| ValidationError::Location {
        id: location.id.clone(),
        reason,
    };

    if location.id.trim().is_empty() {
        return Err(fail("empty id".to_string()));
    }
    if !location.coordinates.is_valid() {
        return Err(fail(format!(
            "coordinates out of range ({}, {})",
            location.coordinates.lat, location.coordinates.lng
        )));
    }

    let cap = &location.capacity;
    if cap.available > cap.total {
        return Err(fail(format!(
            "available {} exceeds total {}",
            cap.available, cap.total
        )));
    }
    if let Some(reserved) = cap.reserved {
        if reserved > cap.total {
            return Err(fail(format!("reserved {} exceeds total {}", reserved, cap.total)));
        }
    }

    Ok(())
}

/// Validate a config feed payload.
pub fn validate_config(value: Value) -> Result<ConfigResponse, ValidationError> {
    let response: ConfigResponse = parse("config payload", value)?;
    check_config(&response.config)?;
    Ok(response)
}

fn check_config(config: &AppConfig) -> Result<(), ValidationError> {
    let branding = &config.branding;
    for (field, value) in [
        ("branding.name", &branding.name),
        ("branding.primaryColor", &branding.primary_color),
        ("branding.secondaryColor", &branding.secondary_color),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::Config(format!("{} is empty", field)));
        }
    }

    if !config.map.center.is_valid() {
        return Err(ValidationError::Config("map.center out of range".to_string()));
    }
    if !ZOOM_RANGE.contains(&config.map.zoom) {
        return Err(ValidationError::Config(format!(
            "map.zoom {} outside {:?}",
            config.map.zoom, ZOOM_RANGE
        )));
    }

    let interval = config.data_source.refresh_interval;
    if interval < MIN_REFRESH_INTERVAL_MS {
        return Err(ValidationError::Config(format!(
            "dataSource.refreshInterval {}ms below minimum {}ms",
            interval, MIN_REFRESH_INTERVAL_MS
        )));
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
