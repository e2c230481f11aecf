use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, BookingFilter};
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::{Booking, BookingStatus, NewBooking};
use crate::services::bookings::{self, CheckOutcome, StatusChange};
use crate::services::events;
use crate::services::slots::SlotAdjustment;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewBooking>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = {
        let mut db = state.db()?;
        let booking = bookings::create_booking(&mut db, body)?;
        events::publish_booking_change(&db, &state.events_tx, &booking, booking.holds_slot);
        booking
    };

    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub user_id: Option<String>,
    pub spot_id: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let filter = BookingFilter {
        status: parse_status(query.status.as_deref())?,
        user_id: query.user_id.as_deref(),
        spot_id: query.spot_id.as_deref(),
        limit: Some(query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)),
    };

    let bookings = {
        let db = state.db()?;
        queries::list_bookings(&db, &filter)?
    };
    Ok(Json(bookings))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = {
        let db = state.db()?;
        queries::get_booking_by_id(&db, &id)?
    };
    booking
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

// POST /api/bookings/:id/check
#[derive(Serialize)]
pub struct CheckResponse {
    message: &'static str,
    #[serde(flatten)]
    outcome: CheckOutcome,
}

pub async fn check_in_or_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<CheckResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let outcome = {
        let mut db = state.db()?;
        let outcome = bookings::check_in_or_out(&mut db, &id)?;
        let released = matches!(outcome, CheckOutcome::CheckedOut { adjustment: Some(_), .. });
        events::publish_booking_change(&db, &state.events_tx, outcome.booking(), released);
        outcome
    };

    Ok(Json(CheckResponse {
        message: outcome.message(),
        outcome,
    }))
}

// POST /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    booking: Booking,
    adjustment: Option<SlotAdjustment>,
}

impl From<StatusChange> for StatusResponse {
    fn from(change: StatusChange) -> Self {
        Self {
            booking: change.booking,
            adjustment: change.adjustment,
        }
    }
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let next = parse_status(Some(body.status.as_str()))?
        .ok_or_else(|| AppError::Validation("status is required".to_string()))?;
    apply_status(&state, &id, next).map(Json)
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    apply_status(&state, &id, BookingStatus::Cancelled).map(Json)
}

fn apply_status(state: &AppState, id: &str, next: BookingStatus) -> Result<StatusResponse, AppError> {
    let mut db = state.db()?;
    let change = bookings::set_booking_status(&mut db, id, next)?;
    events::publish_booking_change(&db, &state.events_tx, &change.booking, change.adjustment.is_some());
    Ok(change.into())
}

fn parse_status(raw: Option<&str>) -> Result<Option<BookingStatus>, AppError> {
    raw.map(|s| {
        BookingStatus::parse(s).ok_or_else(|| AppError::Validation(format!("unknown booking status: {s}")))
    })
    .transpose()
}
