use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::{ChangeEvent, NewParkingSpot, ParkingSpot, SpotStatus, SpotUpdate};
use crate::services::{events, spots};
use crate::state::AppState;

// GET /api/spots
#[derive(Deserialize)]
pub struct SpotsQuery {
    pub status: Option<String>,
}

pub async fn list_spots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SpotsQuery>,
) -> Result<Json<Vec<ParkingSpot>>, AppError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            SpotStatus::parse(s).ok_or_else(|| AppError::Validation(format!("unknown spot status: {s}")))?,
        ),
        None => None,
    };

    let spots = {
        let db = state.db()?;
        queries::list_spots(&db, status)?
    };
    Ok(Json(spots))
}

// GET /api/spots/:id
pub async fn get_spot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ParkingSpot>, AppError> {
    let spot = {
        let db = state.db()?;
        queries::get_spot(&db, &id)?
    };
    spot.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("parking spot {id}")))
}

// POST /api/spots
pub async fn create_spot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewParkingSpot>,
) -> Result<(StatusCode, Json<ParkingSpot>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let spot = {
        let mut db = state.db()?;
        spots::create_parking_spot(&mut db, &state.config.spot_id_prefix, body)?
    };
    events::publish(&state.events_tx, ChangeEvent::SpotChanged { spot: spot.clone() });

    Ok((StatusCode::CREATED, Json(spot)))
}

// PUT /api/spots/:id
pub async fn update_spot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<SpotUpdate>,
) -> Result<Json<ParkingSpot>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let spot = {
        let mut db = state.db()?;
        spots::update_parking_spot(&mut db, &id, body)?
    };
    events::publish(&state.events_tx, ChangeEvent::SpotChanged { spot: spot.clone() });

    Ok(Json(spot))
}

// DELETE /api/spots/:id
pub async fn delete_spot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    {
        let mut db = state.db()?;
        spots::delete_parking_spot(&mut db, &id)?;
    }
    events::publish(&state.events_tx, ChangeEvent::SpotDeleted { spot_id: id });

    Ok(Json(serde_json::json!({"ok": true})))
}
