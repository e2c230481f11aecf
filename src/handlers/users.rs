use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::{NewUser, User};
use crate::services::users;
use crate::state::AppState;

// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let users = {
        let db = state.db()?;
        queries::list_users(&db)?
    };
    Ok(Json(users))
}

// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let user = {
        let db = state.db()?;
        users::create_user(&db, body)?
    };
    Ok((StatusCode::CREATED, Json(user)))
}
