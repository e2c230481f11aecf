use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{fmt_ts, TS_FORMAT};
use crate::models::{Booking, BookingStatus, ParkingSpot, SpotStatus, User};

// ── Counters ──

/// Increments the named counter and returns its new value. Callers run this
/// inside the transaction that consumes the value.
pub fn next_counter_value(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO counters (name, value) VALUES (?1, 1)
         ON CONFLICT(name) DO UPDATE SET value = value + 1",
        params![name],
    )?;
    conn.query_row(
        "SELECT value FROM counters WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
}

// ── Parking Spots ──

const SPOT_COLUMNS: &str = "id, name, address, latitude, longitude, total_spots, available_spots, hourly_price, \
     status, is_verified, amenities, vehicle_types, rating, review_count, created_at, updated_at";

pub fn insert_spot(conn: &Connection, spot: &ParkingSpot) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO parking_spots (id, name, address, latitude, longitude, total_spots, available_spots, hourly_price,
             status, is_verified, amenities, vehicle_types, rating, review_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            spot.id,
            spot.name,
            spot.address,
            spot.latitude,
            spot.longitude,
            spot.total_spots,
            spot.available_spots,
            spot.hourly_price,
            spot.status,
            spot.is_verified,
            to_json_list(&spot.amenities),
            to_json_list(&spot.vehicle_types),
            spot.rating,
            spot.review_count,
            fmt_ts(&spot.created_at),
            fmt_ts(&spot.updated_at),
        ],
    )?;
    Ok(())
}

pub fn update_spot(conn: &Connection, spot: &ParkingSpot) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE parking_spots SET name = ?2, address = ?3, latitude = ?4, longitude = ?5, total_spots = ?6,
             available_spots = ?7, hourly_price = ?8, status = ?9, is_verified = ?10, amenities = ?11,
             vehicle_types = ?12, rating = ?13, review_count = ?14, updated_at = ?15
         WHERE id = ?1",
        params![
            spot.id,
            spot.name,
            spot.address,
            spot.latitude,
            spot.longitude,
            spot.total_spots,
            spot.available_spots,
            spot.hourly_price,
            spot.status,
            spot.is_verified,
            to_json_list(&spot.amenities),
            to_json_list(&spot.vehicle_types),
            spot.rating,
            spot.review_count,
            fmt_ts(&spot.updated_at),
        ],
    )?;
    Ok(count > 0)
}

pub fn set_spot_capacity(
    conn: &Connection,
    id: &str,
    available_spots: i64,
    status: SpotStatus,
    updated_at: &NaiveDateTime,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE parking_spots SET available_spots = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
        params![available_spots, status, fmt_ts(updated_at), id],
    )?;
    Ok(count > 0)
}

pub fn get_spot(conn: &Connection, id: &str) -> rusqlite::Result<Option<ParkingSpot>> {
    conn.query_row(
        &format!("SELECT {SPOT_COLUMNS} FROM parking_spots WHERE id = ?1"),
        params![id],
        parse_spot_row,
    )
    .optional()
}

pub fn list_spots(conn: &Connection, status_filter: Option<SpotStatus>) -> rusqlite::Result<Vec<ParkingSpot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SPOT_COLUMNS} FROM parking_spots WHERE (?1 IS NULL OR status = ?1) ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![status_filter], parse_spot_row)?;
    rows.collect()
}

pub fn delete_spot(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM parking_spots WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_spot_row(row: &Row) -> rusqlite::Result<ParkingSpot> {
    Ok(ParkingSpot {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        total_spots: row.get(5)?,
        available_spots: row.get(6)?,
        hourly_price: row.get(7)?,
        status: row.get(8)?,
        is_verified: row.get(9)?,
        amenities: get_json_list(row, 10)?,
        vehicle_types: get_json_list(row, 11)?,
        rating: row.get(12)?,
        review_count: row.get(13)?,
        created_at: get_ts(row, 14)?,
        updated_at: get_ts(row, 15)?,
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, parking_spot_id, parking_spot_name, user_id, vehicle_id, start_time, end_time, \
     total_price, status, check_in_time, check_out_time, notes, holds_slot, created_at, updated_at";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, parking_spot_id, parking_spot_name, user_id, vehicle_id, start_time, end_time,
             total_price, status, check_in_time, check_out_time, notes, holds_slot, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            booking.id,
            booking.parking_spot_id,
            booking.parking_spot_name,
            booking.user_id,
            booking.vehicle_id,
            fmt_ts(&booking.start_time),
            fmt_ts(&booking.end_time),
            booking.total_price,
            booking.status,
            booking.check_in_time.as_ref().map(fmt_ts),
            booking.check_out_time.as_ref().map(fmt_ts),
            booking.notes,
            booking.holds_slot,
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

/// Writes the mutable lifecycle fields of a booking back to its row.
pub fn save_booking_state(conn: &Connection, booking: &Booking) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, check_in_time = ?2, check_out_time = ?3, holds_slot = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            booking.status,
            booking.check_in_time.as_ref().map(fmt_ts),
            booking.check_out_time.as_ref().map(fmt_ts),
            booking.holds_slot,
            fmt_ts(&booking.updated_at),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        parse_booking_row,
    )
    .optional()
}

#[derive(Debug, Default, Clone)]
pub struct BookingFilter<'a> {
    pub status: Option<BookingStatus>,
    pub user_id: Option<&'a str>,
    pub spot_id: Option<&'a str>,
    pub limit: Option<i64>,
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter<'_>) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE (?1 IS NULL OR status = ?1)
           AND (?2 IS NULL OR user_id = ?2)
           AND (?3 IS NULL OR parking_spot_id = ?3)
         ORDER BY start_time DESC
         LIMIT ?4"
    ))?;
    let rows = stmt.query_map(
        params![filter.status, filter.user_id, filter.spot_id, filter.limit.unwrap_or(-1)],
        parse_booking_row,
    )?;
    rows.collect()
}

pub fn count_slot_holding_bookings(conn: &Connection, spot_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE parking_spot_id = ?1 AND status IN ('confirmed', 'active')",
        params![spot_id],
        |row| row.get(0),
    )
}

fn parse_booking_row(row: &Row) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        parking_spot_id: row.get(1)?,
        parking_spot_name: row.get(2)?,
        user_id: row.get(3)?,
        vehicle_id: row.get(4)?,
        start_time: get_ts(row, 5)?,
        end_time: get_ts(row, 6)?,
        total_price: row.get(7)?,
        status: row.get(8)?,
        check_in_time: get_opt_ts(row, 9)?,
        check_out_time: get_opt_ts(row, 10)?,
        notes: row.get(11)?,
        holds_slot: row.get(12)?,
        created_at: get_ts(row, 13)?,
        updated_at: get_ts(row, 14)?,
    })
}

// ── Users ──

pub fn insert_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.id, user.name, user.email, user.role, fmt_ts(&user.created_at)],
    )?;
    Ok(())
}

pub fn list_users(conn: &Connection) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, name, email, role, created_at FROM users ORDER BY created_at ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            role: row.get(3)?,
            created_at: get_ts(row, 4)?,
        })
    })?;
    rows.collect()
}

// ── Row helpers ──

fn get_ts(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TS_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_opt_ts(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDateTime::parse_from_str(&s, TS_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn get_json_list(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn to_json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}
