pub mod admin;
pub mod bookings;
pub mod events;
pub mod health;
pub mod spots;
pub mod users;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/spots", get(spots::list_spots).post(spots::create_spot))
        .route(
            "/api/spots/:id",
            get(spots::get_spot)
                .put(spots::update_spot)
                .delete(spots::delete_spot),
        )
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route("/api/bookings/:id/check", post(bookings::check_in_or_out))
        .route("/api/bookings/:id/status", post(bookings::set_status))
        .route("/api/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/admin/stats", get(admin::get_stats))
        .route("/api/admin/revenue", get(admin::get_revenue))
        .route("/api/events", get(events::events_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
