//! Booking lifecycle: creation, check-in/check-out and direct status changes.
//!
//! A booking holds one slot at its spot while it is `confirmed` or `active`.
//! Pending bookings never touch the counter. `Booking::holds_slot` records
//! whether the occupy has happened, so each booking decrements at most once
//! and releases at most once.

use chrono::SubsecRound;
use rusqlite::{Connection, Transaction};
use serde::Serialize;

use crate::db::{self, queries, with_transaction};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, NewBooking, ParkingSpot, SpotStatus};
use crate::services::slots::{self, SlotAdjustment};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CheckOutcome {
    CheckedIn { booking: Booking },
    CheckedOut { booking: Booking, adjustment: Option<SlotAdjustment> },
}

impl CheckOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            CheckOutcome::CheckedIn { booking } | CheckOutcome::CheckedOut { booking, .. } => booking,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            CheckOutcome::CheckedIn { .. } => "Checked in successfully",
            CheckOutcome::CheckedOut { .. } => "Checked out successfully",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub booking: Booking,
    pub adjustment: Option<SlotAdjustment>,
}

pub fn create_booking(conn: &mut Connection, mut new_booking: NewBooking) -> Result<Booking, AppError> {
    // Stored timestamps carry whole seconds only
    new_booking.start_time = new_booking.start_time.trunc_subsecs(0);
    new_booking.end_time = new_booking.end_time.trunc_subsecs(0);
    validate_new_booking(&new_booking)?;

    let booking = with_transaction(conn, |tx| {
        let spot = queries::get_spot(tx, &new_booking.parking_spot_id)?
            .ok_or_else(|| AppError::NotFound(format!("parking spot {}", new_booking.parking_spot_id)))?;

        if matches!(spot.status, SpotStatus::Maintenance | SpotStatus::Closed) {
            return Err(AppError::Conflict(format!("parking spot {} is {}", spot.id, spot.status)));
        }

        let holds_slot = new_booking.status.occupies_slot();
        if holds_slot {
            occupy(tx, &spot)?;
        }

        let now = db::now();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            parking_spot_id: spot.id.clone(),
            parking_spot_name: spot.name.clone(),
            user_id: new_booking.user_id.clone(),
            vehicle_id: new_booking.vehicle_id.clone(),
            start_time: new_booking.start_time,
            end_time: new_booking.end_time,
            total_price: new_booking
                .total_price
                .unwrap_or_else(|| compute_price(spot.hourly_price, &new_booking)),
            status: new_booking.status,
            check_in_time: None,
            check_out_time: None,
            notes: new_booking.notes.clone(),
            holds_slot,
            created_at: now,
            updated_at: now,
        };
        queries::insert_booking(tx, &booking)?;
        Ok(booking)
    })?;

    tracing::info!(
        booking_id = %booking.id,
        spot_id = %booking.parking_spot_id,
        status = %booking.status,
        "booking created"
    );
    Ok(booking)
}

/// Advances a booking one step along the occupancy lifecycle:
/// `confirmed` is checked in, `active` is checked out and its slot released.
/// Any other status yields `InvalidTransition` with nothing written.
pub fn check_in_or_out(conn: &mut Connection, booking_id: &str) -> Result<CheckOutcome, AppError> {
    let outcome = with_transaction(conn, |tx| {
        let mut booking = load_booking(tx, booking_id)?;
        match booking.status {
            BookingStatus::Confirmed => {
                apply_transition(tx, &mut booking, BookingStatus::Active)?;
                Ok(CheckOutcome::CheckedIn { booking })
            }
            BookingStatus::Active => {
                let adjustment = apply_transition(tx, &mut booking, BookingStatus::Completed)?;
                Ok(CheckOutcome::CheckedOut { booking, adjustment })
            }
            other => Err(AppError::InvalidTransition {
                from: other,
                requested: "check in or check out".to_string(),
            }),
        }
    })?;

    tracing::info!(
        booking_id = %booking_id,
        status = %outcome.booking().status,
        "{}",
        outcome.message()
    );
    Ok(outcome)
}

/// Moves a booking directly to `next`, applying the occupy/release the move implies.
pub fn set_booking_status(
    conn: &mut Connection,
    booking_id: &str,
    next: BookingStatus,
) -> Result<StatusChange, AppError> {
    let change = with_transaction(conn, |tx| {
        let mut booking = load_booking(tx, booking_id)?;
        let adjustment = apply_transition(tx, &mut booking, next)?;
        Ok(StatusChange { booking, adjustment })
    })?;

    tracing::info!(booking_id = %booking_id, status = %next, "booking status changed");
    Ok(change)
}

pub fn cancel_booking(conn: &mut Connection, booking_id: &str) -> Result<StatusChange, AppError> {
    set_booking_status(conn, booking_id, BookingStatus::Cancelled)
}

fn load_booking(tx: &Transaction<'_>, booking_id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(tx, booking_id)?.ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}

fn apply_transition(
    tx: &Transaction<'_>,
    booking: &mut Booking,
    next: BookingStatus,
) -> Result<Option<SlotAdjustment>, AppError> {
    if !booking.status.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            from: booking.status,
            requested: format!("move to {next}"),
        });
    }

    let adjustment = match booking.status.slot_delta(next) {
        -1 if !booking.holds_slot => {
            let spot = queries::get_spot(tx, &booking.parking_spot_id)?
                .ok_or_else(|| AppError::NotFound(format!("parking spot {}", booking.parking_spot_id)))?;
            let adjustment = occupy(tx, &spot)?;
            booking.holds_slot = true;
            Some(adjustment)
        }
        1 if booking.holds_slot => {
            let adjustment = slots::adjust_available_spots(tx, &booking.parking_spot_id, 1)?;
            booking.holds_slot = false;
            Some(adjustment)
        }
        0 => None,
        _ => {
            tracing::warn!(
                booking_id = %booking.id,
                holds_slot = booking.holds_slot,
                "slot already settled for booking, counter left unchanged"
            );
            None
        }
    };

    let now = db::now();
    match next {
        BookingStatus::Active => booking.check_in_time = Some(now),
        BookingStatus::Completed => booking.check_out_time = Some(now),
        _ => {}
    }
    booking.status = next;
    booking.updated_at = now;

    if !queries::save_booking_state(tx, booking)? {
        return Err(AppError::NotFound(format!("booking {}", booking.id)));
    }
    Ok(adjustment)
}

fn occupy(tx: &Transaction<'_>, spot: &ParkingSpot) -> Result<SlotAdjustment, AppError> {
    if spot.available_spots <= 0 {
        return Err(AppError::NoAvailability(spot.id.clone()));
    }
    slots::adjust_available_spots(tx, &spot.id, -1)
}

fn validate_new_booking(new_booking: &NewBooking) -> Result<(), AppError> {
    if new_booking.end_time <= new_booking.start_time {
        return Err(AppError::Validation("end_time must be after start_time".to_string()));
    }
    if !matches!(new_booking.status, BookingStatus::Pending | BookingStatus::Confirmed) {
        return Err(AppError::Validation(format!(
            "a booking cannot be created as {}",
            new_booking.status
        )));
    }
    if let Some(price) = new_booking.total_price {
        if price.is_nan() || price < 0.0 {
            return Err(AppError::Validation("total_price must not be negative".to_string()));
        }
    }
    if new_booking.user_id.trim().is_empty() || new_booking.vehicle_id.trim().is_empty() {
        return Err(AppError::Validation("user_id and vehicle_id are required".to_string()));
    }
    Ok(())
}

/// Hourly rate times the window length, rounded to cents.
fn compute_price(hourly_price: f64, new_booking: &NewBooking) -> f64 {
    let minutes = (new_booking.end_time - new_booking.start_time).num_minutes() as f64;
    (hourly_price * minutes / 60.0 * 100.0).round() / 100.0
}
