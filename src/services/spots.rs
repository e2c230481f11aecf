use rusqlite::Connection;

use crate::db::{self, queries, with_transaction};
use crate::errors::AppError;
use crate::models::{NewParkingSpot, ParkingSpot, SpotStatus, SpotUpdate};

const SPOT_COUNTER: &str = "parking_spot_id";
const SPOT_ID_WIDTH: usize = 6;

pub fn format_spot_id(prefix: &str, seq: i64) -> String {
    format!("{prefix}{seq:0width$}", width = SPOT_ID_WIDTH)
}

/// Persists a new spot with every slot free. The id comes from a monotonic
/// counter bumped in the same transaction as the insert.
pub fn create_parking_spot(
    conn: &mut Connection,
    id_prefix: &str,
    new_spot: NewParkingSpot,
) -> Result<ParkingSpot, AppError> {
    validate_new_spot(&new_spot)?;

    let spot = with_transaction(conn, |tx| {
        let seq = queries::next_counter_value(tx, SPOT_COUNTER)?;
        let now = db::now();
        let spot = ParkingSpot {
            id: format_spot_id(id_prefix, seq),
            name: new_spot.name.trim().to_string(),
            address: new_spot.address.clone(),
            latitude: new_spot.latitude,
            longitude: new_spot.longitude,
            total_spots: new_spot.total_spots,
            available_spots: new_spot.total_spots,
            hourly_price: new_spot.hourly_price,
            status: new_spot.status.unwrap_or(SpotStatus::Available),
            is_verified: new_spot.is_verified,
            amenities: new_spot.amenities.clone(),
            vehicle_types: new_spot.vehicle_types.clone(),
            rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        };
        queries::insert_spot(tx, &spot)?;
        Ok(spot)
    })?;

    tracing::info!(spot_id = %spot.id, total = spot.total_spots, "parking spot created");
    Ok(spot)
}

/// Applies an operator edit. Changing `total_spots` keeps the number of
/// occupied slots and re-clamps the free count into the new range.
pub fn update_parking_spot(conn: &mut Connection, id: &str, update: SpotUpdate) -> Result<ParkingSpot, AppError> {
    let spot = with_transaction(conn, |tx| {
        let mut spot = queries::get_spot(tx, id)?.ok_or_else(|| AppError::NotFound(format!("parking spot {id}")))?;
        apply_update(&mut spot, &update)?;
        spot.updated_at = db::now();
        queries::update_spot(tx, &spot)?;
        Ok(spot)
    })?;

    tracing::info!(spot_id = %spot.id, available = spot.available_spots, total = spot.total_spots, "parking spot updated");
    Ok(spot)
}

/// Hard-deletes a spot. Refused while bookings still hold slots at it.
pub fn delete_parking_spot(conn: &mut Connection, id: &str) -> Result<(), AppError> {
    with_transaction(conn, |tx| {
        let holding = queries::count_slot_holding_bookings(tx, id)?;
        if holding > 0 {
            return Err(AppError::Conflict(format!(
                "parking spot {id} still has {holding} confirmed or active bookings"
            )));
        }
        if !queries::delete_spot(tx, id)? {
            return Err(AppError::NotFound(format!("parking spot {id}")));
        }
        Ok(())
    })?;

    tracing::info!(spot_id = %id, "parking spot deleted");
    Ok(())
}

fn validate_new_spot(spot: &NewParkingSpot) -> Result<(), AppError> {
    if spot.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    if spot.total_spots <= 0 {
        return Err(AppError::Validation("total_spots must be positive".to_string()));
    }
    if spot.hourly_price.is_nan() || spot.hourly_price < 0.0 {
        return Err(AppError::Validation("hourly_price must not be negative".to_string()));
    }
    Ok(())
}

fn apply_update(spot: &mut ParkingSpot, update: &SpotUpdate) -> Result<(), AppError> {
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        spot.name = name.trim().to_string();
    }
    if let Some(address) = &update.address {
        spot.address = address.clone();
    }
    if let Some(lat) = update.latitude {
        spot.latitude = lat;
    }
    if let Some(lon) = update.longitude {
        spot.longitude = lon;
    }
    if let Some(price) = update.hourly_price {
        if price.is_nan() || price < 0.0 {
            return Err(AppError::Validation("hourly_price must not be negative".to_string()));
        }
        spot.hourly_price = price;
    }
    if let Some(total) = update.total_spots {
        if total <= 0 {
            return Err(AppError::Validation("total_spots must be positive".to_string()));
        }
        let occupied = spot.occupied_spots();
        spot.total_spots = total;
        spot.available_spots = (total - occupied).clamp(0, total);
    }
    if let Some(available) = update.available_spots {
        if available < 0 || available > spot.total_spots {
            return Err(AppError::Validation(format!(
                "available_spots must be between 0 and {}",
                spot.total_spots
            )));
        }
        spot.available_spots = available;
    }
    if let Some(rating) = update.rating {
        if !(0.0..=5.0).contains(&rating) {
            return Err(AppError::Validation("rating must be between 0 and 5".to_string()));
        }
        spot.rating = rating;
    }
    if let Some(count) = update.review_count {
        spot.review_count = count.max(0);
    }
    if let Some(verified) = update.is_verified {
        spot.is_verified = verified;
    }
    if let Some(amenities) = &update.amenities {
        spot.amenities = amenities.clone();
    }
    if let Some(types) = &update.vehicle_types {
        spot.vehicle_types = types.clone();
    }
    spot.status = match update.status {
        Some(status) => status,
        None => spot.status.derive_for(spot.available_spots),
    };
    Ok(())
}
