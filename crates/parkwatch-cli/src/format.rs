//! Display helpers for terminal output.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use parkwatch_core::ParkingLocation;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Compact countdown such as `4m 05s` or `12s`.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

pub fn format_local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// One table row: name, type, free/total, occupancy.
pub fn format_location_row(location: &ParkingLocation) -> String {
    let cap = &location.capacity;
    let status = if location.is_full() {
        "FULL".to_string()
    } else {
        format!("{:>3.0}%", cap.occupancy_ratio() * 100.0)
    };
    format!(
        "{:<28} {:<9} {:>4}/{:<4} {}",
        truncate_string(&location.name, 28),
        location.kind.display_name(),
        cap.available,
        cap.total,
        status
    )
}
