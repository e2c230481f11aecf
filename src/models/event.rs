use serde::Serialize;

use super::{Booking, ParkingSpot};

/// Change notification published after a mutation commits.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeEvent {
    SpotChanged { spot: ParkingSpot },
    SpotDeleted { spot_id: String },
    BookingChanged { booking: Booking },
}

impl ChangeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::SpotChanged { .. } => "spot_changed",
            ChangeEvent::SpotDeleted { .. } => "spot_deleted",
            ChangeEvent::BookingChanged { .. } => "booking_changed",
        }
    }
}
