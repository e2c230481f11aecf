use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::models::{AdminStats, Booking, BookingStatus, ParkingSpot, RevenueData, SpotStatus, User, UserRole};

/// Folds a snapshot of users, spots and bookings into dashboard counters.
/// Revenue only counts completed bookings; "today" is matched on `end_time`.
pub fn compute_admin_stats(users: &[User], spots: &[ParkingSpot], bookings: &[Booking], today: NaiveDate) -> AdminStats {
    let mut stats = AdminStats::default();

    for role in [UserRole::Admin, UserRole::Operator, UserRole::User] {
        stats.users_by_role.insert(role.as_str().to_string(), 0);
    }
    for user in users {
        *stats.users_by_role.entry(user.role.as_str().to_string()).or_default() += 1;
    }
    stats.total_users = users.len() as i64;

    for status in SpotStatus::ALL {
        stats.spots_by_status.insert(status.as_str().to_string(), 0);
    }
    let mut rating_sum = 0.0;
    let mut rated = 0;
    for spot in spots {
        *stats.spots_by_status.entry(spot.status.as_str().to_string()).or_default() += 1;
        stats.total_capacity += spot.total_spots;
        stats.total_available += spot.available_spots;
        if spot.rating > 0.0 {
            rating_sum += spot.rating;
            rated += 1;
        }
    }
    stats.total_spots = spots.len() as i64;
    if rated > 0 {
        stats.average_rating = rating_sum / rated as f64;
    }
    if stats.total_capacity > 0 {
        stats.occupancy_rate =
            (stats.total_capacity - stats.total_available) as f64 / stats.total_capacity as f64;
    }

    for status in BookingStatus::ALL {
        stats.bookings_by_status.insert(status.as_str().to_string(), 0);
    }
    for booking in bookings {
        *stats.bookings_by_status.entry(booking.status.as_str().to_string()).or_default() += 1;
        if booking.status == BookingStatus::Completed {
            stats.total_revenue += booking.total_price;
            if booking.end_time.date() == today {
                stats.today_revenue += booking.total_price;
            }
        }
    }
    stats.total_bookings = bookings.len() as i64;

    stats
}

/// Per-day revenue of completed bookings over the `days` days ending at
/// `today`, oldest first, with empty days zero-filled.
pub fn revenue_series(bookings: &[Booking], today: NaiveDate, days: u32) -> Vec<RevenueData> {
    (0..days as i64)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let (revenue, count) = bookings
                .iter()
                .filter(|b| b.status == BookingStatus::Completed && b.end_time.date() == date)
                .fold((0.0, 0), |(sum, n), b| (sum + b.total_price, n + 1));
            RevenueData {
                date: date.format("%Y-%m-%d").to_string(),
                revenue,
                bookings: count,
            }
        })
        .collect()
}

pub fn load_admin_stats(conn: &Connection, today: NaiveDate) -> Result<AdminStats, AppError> {
    let users = queries::list_users(conn)?;
    let spots = queries::list_spots(conn, None)?;
    let bookings = queries::list_bookings(conn, &BookingFilter::default())?;
    Ok(compute_admin_stats(&users, &spots, &bookings, today))
}

pub fn load_revenue_series(conn: &Connection, today: NaiveDate, days: u32) -> Result<Vec<RevenueData>, AppError> {
    let bookings = queries::list_bookings(
        conn,
        &BookingFilter {
            status: Some(BookingStatus::Completed),
            ..Default::default()
        },
    )?;
    Ok(revenue_series(&bookings, today, days))
}
