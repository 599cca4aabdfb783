//! Domain models for parking facilities.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Space counts for a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capacity {
    pub total: u32,
    pub available: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<u32>,
}

impl Capacity {
    /// Fraction of spaces in use, 0.0 for a facility with no spaces.
    pub fn occupancy_ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let occupied = self.total.saturating_sub(self.available);
        f64::from(occupied) / f64::from(self.total)
    }
}

/// Optional posted rules for a facility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<String>>,
}

/// Kind of facility. Unknown values fail deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParkingType {
    Street,
    Lot,
    Structure,
    Garage,
}

impl ParkingType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ParkingType::Street => "Street",
            ParkingType::Lot => "Lot",
            ParkingType::Structure => "Structure",
            ParkingType::Garage => "Garage",
        }
    }
}

impl fmt::Display for ParkingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A single parking facility as published by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingLocation {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub capacity: Capacity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<ParkingRules>,
    #[serde(rename = "type")]
    pub kind: ParkingType,
    /// Set upstream, never by this client.
    pub last_updated: String,
}

impl ParkingLocation {
    pub fn is_full(&self) -> bool {
        self.capacity.available == 0
    }

    /// Parse `last_updated` as RFC 3339. Returns None if the feed sent
    /// something else.
    pub fn last_updated_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.last_updated).ok()
    }
}

/// Envelope returned by the parking feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationsResponse {
    pub locations: Vec<ParkingLocation>,
    pub last_updated: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parking_type_wire_names() {
        let kind: ParkingType = serde_json::from_str("\"garage\"").unwrap();
        assert_eq!(kind, ParkingType::Garage);
        assert!(serde_json::from_str::<ParkingType>("\"driveway\"").is_err());
        assert_eq!(serde_json::to_string(&ParkingType::Street).unwrap(), "\"street\"");
    }

    #[test]
    fn test_occupancy_ratio() {
        let cap = Capacity { total: 40, available: 10, reserved: None };
        assert!((cap.occupancy_ratio() - 0.75).abs() < f64::EPSILON);

        let empty = Capacity { total: 0, available: 0, reserved: None };
        assert_eq!(empty.occupancy_ratio(), 0.0);
    }

    #[test]
    fn test_coordinates_range() {
        assert!(Coordinates { lat: 44.26, lng: -72.58 }.is_valid());
        assert!(!Coordinates { lat: 91.0, lng: 0.0 }.is_valid());
        assert!(!Coordinates { lat: 0.0, lng: -180.5 }.is_valid());
        assert!(!Coordinates { lat: f64::NAN, lng: 0.0 }.is_valid());
    }

    #[test]
    fn test_location_camel_case_fields() {
        let json = serde_json::json!({
            "id": "main-st",
            "name": "Main Street",
            "address": "1 Main St",
            "coordinates": { "lat": 44.2, "lng": -72.5 },
            "capacity": { "total": 20, "available": 0 },
            "rules": { "timeLimit": "2 hours", "restrictions": ["No overnight"] },
            "type": "street",
            "lastUpdated": "2024-05-01T12:00:00Z"
        });
        let loc: ParkingLocation = serde_json::from_value(json).unwrap();
        assert!(loc.is_full());
        assert_eq!(loc.rules.as_ref().unwrap().time_limit.as_deref(), Some("2 hours"));
        assert!(loc.last_updated_at().is_some());
    }
}
