//! Core types for station queue management
//!
//! This module defines the identifiers, queue entries and station summaries
//! exchanged with the queue service, using newtype patterns for identifiers
//! and lenient decoding for the loosely typed numeric fields the service emits.

use core::fmt;
use core::ops::Deref;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ----------------------------------------------------------------------------
// Station Identifier
// ----------------------------------------------------------------------------

/// Opaque identifier of a station (destination) queue
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    /// Create a new station identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Deref for StationId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ----------------------------------------------------------------------------
// Entry Identifier
// ----------------------------------------------------------------------------

/// Identity of a queue entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Create a new entry identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Millisecond timestamp since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Get the current wall-clock timestamp
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as u64)
    }

    /// Get the raw milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

// ----------------------------------------------------------------------------
// Queue Entry
// ----------------------------------------------------------------------------

/// Day pass status reported when the service omits one
pub const NO_DAY_PASS: &str = "no_pass";

/// One vehicle waiting in a station queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: EntryId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vehicle_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub license_plate: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vehicle_type: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub total_seats: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub available_seats: u32,
    /// 1-based position within the station queue
    #[serde(default, deserialize_with = "lenient_u32")]
    pub queue_position: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_day_pass: bool,
    #[serde(default = "default_day_pass_status", deserialize_with = "day_pass_status")]
    pub day_pass_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_pass_purchased_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_trips_today: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
}

impl QueueEntry {
    /// Create an entry with the given identity and plate, everything else defaulted
    pub fn new(id: impl Into<EntryId>, license_plate: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vehicle_id: String::new(),
            license_plate: license_plate.into(),
            vehicle_type: String::new(),
            total_seats: 0,
            available_seats: 0,
            queue_position: 0,
            status: String::new(),
            has_day_pass: false,
            day_pass_status: default_day_pass_status(),
            day_pass_purchased_at: None,
            has_trips_today: false,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    /// Seats already taken on this vehicle
    pub fn occupied_seats(&self) -> u32 {
        self.total_seats.saturating_sub(self.available_seats)
    }
}

// ----------------------------------------------------------------------------
// Station Summary
// ----------------------------------------------------------------------------

/// Per-station aggregate shown in the station list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSummary {
    pub destination_id: StationId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub destination_name: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub total_vehicles: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub total_seats: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub available_seats: u32,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub base_price: f64,
}

// ----------------------------------------------------------------------------
// Lenient Decoding Helpers
// ----------------------------------------------------------------------------

fn default_day_pass_status() -> String {
    NO_DAY_PASS.to_string()
}

fn day_pass_status<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_else(default_day_pass_status))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let value: Option<T> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Numbers may arrive as JSON numbers or numeric strings; anything else is 0
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    let number = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if number.is_finite() { number } else { 0.0 })
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let number = lenient_f64(deserializer)?;
    Ok(number.clamp(0.0, u32::MAX as f64) as u32)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_decodes_numeric_strings() {
        let entry: QueueEntry = serde_json::from_value(json!({
            "id": "e1",
            "licensePlate": "123 TU 4567",
            "totalSeats": "8",
            "availableSeats": 3,
            "queuePosition": "2"
        }))
        .unwrap();

        assert_eq!(entry.total_seats, 8);
        assert_eq!(entry.available_seats, 3);
        assert_eq!(entry.queue_position, 2);
        assert_eq!(entry.occupied_seats(), 5);
    }

    #[test]
    fn test_entry_defaults_missing_and_null_fields() {
        let entry: QueueEntry = serde_json::from_value(json!({
            "id": "e1",
            "hasDayPass": null,
            "dayPassStatus": null,
            "availableSeats": "not a number"
        }))
        .unwrap();

        assert!(!entry.has_day_pass);
        assert!(!entry.has_trips_today);
        assert_eq!(entry.day_pass_status, NO_DAY_PASS);
        assert_eq!(entry.available_seats, 0);
        assert!(entry.day_pass_purchased_at.is_none());
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let mut entry = QueueEntry::new("e9", "77 TU 1");
        entry.queue_position = 4;
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["queuePosition"], 4);
        assert_eq!(value["licensePlate"], "77 TU 1");
        assert!(value.get("dayPassPurchasedAt").is_none());
    }

    #[test]
    fn test_summary_decoding() {
        let summary: StationSummary = serde_json::from_value(json!({
            "destinationId": "tunis",
            "destinationName": "Tunis",
            "totalVehicles": 4,
            "totalSeats": "32",
            "availableSeats": 12,
            "basePrice": "7.5"
        }))
        .unwrap();

        assert_eq!(summary.destination_id, StationId::from("tunis"));
        assert_eq!(summary.total_seats, 32);
        assert_eq!(summary.base_price, 7.5);
    }

    #[test]
    fn test_identifier_display() {
        assert_eq!(StationId::new("sfax").to_string(), "sfax");
        assert_eq!(EntryId::from("abc").as_str(), "abc");
    }
}
