use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::{AdminStats, RevenueData};
use crate::services::stats;
use crate::state::AppState;

const DEFAULT_REVENUE_DAYS: u32 = 7;
const MAX_REVENUE_DAYS: u32 = 90;

// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AdminStats>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let today = chrono::Utc::now().date_naive();
    let stats = {
        let db = state.db()?;
        stats::load_admin_stats(&db, today)?
    };
    Ok(Json(stats))
}

// GET /api/admin/revenue
#[derive(Deserialize)]
pub struct RevenueQuery {
    pub days: Option<u32>,
}

pub async fn get_revenue(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<Vec<RevenueData>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let days = query.days.unwrap_or(DEFAULT_REVENUE_DAYS).clamp(1, MAX_REVENUE_DAYS);
    let today = chrono::Utc::now().date_naive();
    let series = {
        let db = state.db()?;
        stats::load_revenue_series(&db, today, days)?
    };
    Ok(Json(series))
}
