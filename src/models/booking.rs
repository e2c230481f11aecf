use std::fmt;

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub parking_spot_id: String,
    pub parking_spot_name: String,
    pub user_id: String,
    pub vehicle_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub total_price: f64,
    pub status: BookingStatus,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub holds_slot: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input for a new reservation. `total_price` is computed from the spot's
/// hourly rate when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub user_id: String,
    pub vehicle_id: String,
    pub parking_spot_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub total_price: Option<f64>,
    #[serde(default = "default_initial_status")]
    pub status: BookingStatus,
    pub notes: Option<String>,
}

fn default_initial_status() -> BookingStatus {
    BookingStatus::Confirmed
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Active,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "active" => Some(BookingStatus::Active),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether a booking in this status is counted against its spot's capacity.
    /// Pending bookings never hold a slot.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Active)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Active)
                | (Confirmed, Cancelled)
                | (Active, Completed)
                | (Active, Cancelled)
        )
    }

    /// Slot delta applied when moving from `self` to `next`: -1 when the
    /// booking starts holding a slot, +1 when it gives one back.
    pub fn slot_delta(&self, next: BookingStatus) -> i64 {
        match (self.occupies_slot(), next.occupies_slot()) {
            (false, true) => -1,
            (true, false) => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for BookingStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for BookingStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        BookingStatus::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown booking status: {s}").into()))
    }
}
