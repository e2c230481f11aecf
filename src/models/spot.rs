use std::fmt;

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingSpot {
    pub id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_spots: i64,
    pub available_spots: i64,
    pub hourly_price: f64,
    pub status: SpotStatus,
    pub is_verified: bool,
    pub amenities: Vec<String>,
    pub vehicle_types: Vec<String>,
    pub rating: f64,
    pub review_count: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ParkingSpot {
    pub fn occupied_spots(&self) -> i64 {
        self.total_spots - self.available_spots
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewParkingSpot {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    pub total_spots: i64,
    pub hourly_price: f64,
    #[serde(default)]
    pub status: Option<SpotStatus>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub vehicle_types: Vec<String>,
}

/// Operator edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub total_spots: Option<i64>,
    pub available_spots: Option<i64>,
    pub hourly_price: Option<f64>,
    pub status: Option<SpotStatus>,
    pub is_verified: Option<bool>,
    pub amenities: Option<Vec<String>>,
    pub vehicle_types: Option<Vec<String>>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpotStatus {
    Available,
    Occupied,
    Full,
    Maintenance,
    Closed,
    Reserved,
}

impl SpotStatus {
    pub const ALL: [SpotStatus; 6] = [
        SpotStatus::Available,
        SpotStatus::Occupied,
        SpotStatus::Full,
        SpotStatus::Maintenance,
        SpotStatus::Closed,
        SpotStatus::Reserved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpotStatus::Available => "available",
            SpotStatus::Occupied => "occupied",
            SpotStatus::Full => "full",
            SpotStatus::Maintenance => "maintenance",
            SpotStatus::Closed => "closed",
            SpotStatus::Reserved => "reserved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(SpotStatus::Available),
            "occupied" => Some(SpotStatus::Occupied),
            "full" => Some(SpotStatus::Full),
            "maintenance" => Some(SpotStatus::Maintenance),
            "closed" => Some(SpotStatus::Closed),
            "reserved" => Some(SpotStatus::Reserved),
            _ => None,
        }
    }

    /// Status after the free-slot count changes to `available`. Operator-set
    /// states (maintenance, closed, reserved) are kept as they are.
    pub fn derive_for(&self, available: i64) -> SpotStatus {
        match self {
            SpotStatus::Available | SpotStatus::Occupied if available == 0 => SpotStatus::Full,
            SpotStatus::Full if available > 0 => SpotStatus::Available,
            other => *other,
        }
    }
}

impl fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for SpotStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SpotStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        SpotStatus::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown spot status: {s}").into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_becomes_full_at_zero() {
        assert_eq!(SpotStatus::Available.derive_for(0), SpotStatus::Full);
        assert_eq!(SpotStatus::Occupied.derive_for(0), SpotStatus::Full);
        assert_eq!(SpotStatus::Available.derive_for(2), SpotStatus::Available);
    }

    #[test]
    fn test_full_reopens_when_slot_frees() {
        assert_eq!(SpotStatus::Full.derive_for(1), SpotStatus::Available);
        assert_eq!(SpotStatus::Full.derive_for(0), SpotStatus::Full);
    }

    #[test]
    fn test_operator_states_are_sticky() {
        for status in [SpotStatus::Maintenance, SpotStatus::Closed, SpotStatus::Reserved] {
            assert_eq!(status.derive_for(0), status);
            assert_eq!(status.derive_for(5), status);
        }
    }
}
