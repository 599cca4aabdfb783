//! Data models for parking feed entities.
//!
//! This module contains the data structures served by the two upstream feeds:
//!
//! - `ParkingLocation` and its parts (`Coordinates`, `Capacity`, `ParkingRules`)
//! - `AppConfig`: per-deployment branding, map and data-source settings
//! - `LocationsResponse`, `ConfigResponse`: the feed envelopes
//!
//! All types use camelCase field names on the wire.

pub mod app_config;
pub mod location;

pub use app_config::{AppConfig, Branding, ConfigResponse, DataSourceSettings, MapSettings};
pub use location::{
    Capacity, Coordinates, LocationsResponse, ParkingLocation, ParkingRules, ParkingType,
};
