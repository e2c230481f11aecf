//! Transactional adjustment of a spot's free-slot counter.

use rusqlite::Transaction;
use serde::Serialize;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::SpotStatus;

/// Outcome of one counter adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotAdjustment {
    pub previous: i64,
    pub current: i64,
    pub requested_delta: i64,
    pub clamped: bool,
    pub status: SpotStatus,
}

/// Applies `delta` to the spot's `available_spots`, bounded to `[0, total_spots]`.
///
/// Must run inside the transaction that also writes the booking row driving
/// the adjustment. A missing spot returns `NotFound`; the caller propagating
/// it rolls back the whole transaction.
pub fn adjust_available_spots(
    tx: &Transaction<'_>,
    spot_id: &str,
    delta: i64,
) -> Result<SlotAdjustment, AppError> {
    let spot = queries::get_spot(tx, spot_id)?
        .ok_or_else(|| AppError::NotFound(format!("parking spot {spot_id}")))?;

    let target = spot.available_spots.saturating_add(delta);
    let current = target.clamp(0, spot.total_spots);
    let clamped = current != target;
    let status = spot.status.derive_for(current);

    if clamped {
        tracing::warn!(
            spot_id = %spot_id,
            available = spot.available_spots,
            total = spot.total_spots,
            delta,
            "slot adjustment clamped"
        );
    }

    queries::set_spot_capacity(tx, spot_id, current, status, &db::now())?;

    Ok(SlotAdjustment {
        previous: spot.available_spots,
        current,
        requested_delta: delta,
        clamped,
        status,
    })
}
