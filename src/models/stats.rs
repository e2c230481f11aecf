use std::collections::BTreeMap;

use serde::Serialize;

/// Dashboard counters derived from a snapshot of users, spots and bookings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub users_by_role: BTreeMap<String, i64>,
    pub total_spots: i64,
    pub spots_by_status: BTreeMap<String, i64>,
    pub total_capacity: i64,
    pub total_available: i64,
    pub occupancy_rate: f64,
    pub total_bookings: i64,
    pub bookings_by_status: BTreeMap<String, i64>,
    pub total_revenue: f64,
    pub today_revenue: f64,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueData {
    pub date: String,
    pub revenue: f64,
    pub bookings: i64,
}
