use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use quickpark::config::AppConfig;
use quickpark::db;
use quickpark::handlers;
use quickpark::models::ChangeEvent;
use quickpark::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        spot_id_prefix: "QP".to_string(),
        busy_timeout_ms: 1000,
    }
}

fn test_state() -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState::new(conn, test_config()))
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn admin_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer test-token");
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn public_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = test_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn create_spot(state: &Arc<AppState>, total: i64) -> String {
    let (status, json) = send(
        state,
        admin_request(
            "POST",
            "/api/spots",
            Some(serde_json::json!({
                "name": "Downtown Garage",
                "address": "100 Market St",
                "latitude": 37.79,
                "longitude": -122.4,
                "total_spots": total,
                "hourly_price": 6.0,
                "amenities": ["covered"],
                "vehicle_types": ["car", "bike"]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["id"].as_str().unwrap().to_string()
}

async fn create_booking(state: &Arc<AppState>, spot_id: &str, status: &str) -> String {
    let (code, json) = send(
        state,
        public_request(
            "POST",
            "/api/bookings",
            Some(serde_json::json!({
                "user_id": "user-42",
                "vehicle_id": "veh-7",
                "parking_spot_id": spot_id,
                "start_time": "2025-07-01T10:00:00",
                "end_time": "2025-07-01T12:00:00",
                "status": status
            })),
        ),
    )
    .await;
    assert_eq!(code, StatusCode::CREATED, "{json}");
    json["id"].as_str().unwrap().to_string()
}

async fn available(state: &Arc<AppState>, spot_id: &str) -> i64 {
    let (_, json) = send(state, public_request("GET", &format!("/api/spots/{spot_id}"), None)).await;
    json["available_spots"].as_i64().unwrap()
}

// ── Health & Auth ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, json) = send(&state, public_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_admin_requires_auth() {
    let state = test_state();

    let res = test_app(state)
        .oneshot(
            Request::builder()
                .uri("/api/admin/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_wrong_token() {
    let state = test_state();

    let res = test_app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/spots")
                .header("Authorization", "Bearer wrong-token")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"name":"x","total_spots":1,"hourly_price":1.0}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// ── Spots ──

#[tokio::test]
async fn test_spot_create_list_and_sequential_ids() {
    let state = test_state();
    let first = create_spot(&state, 5).await;
    let second = create_spot(&state, 3).await;
    assert_eq!(first, "QP000001");
    assert_eq!(second, "QP000002");

    let (status, json) = send(&state, public_request("GET", "/api/spots", None)).await;
    assert_eq!(status, StatusCode::OK);
    let spots = json.as_array().unwrap();
    assert_eq!(spots.len(), 2);
    assert_eq!(spots[0]["available_spots"], 5);
    assert_eq!(spots[0]["status"], "available");
    assert_eq!(spots[0]["vehicle_types"][1], "bike");
}

#[tokio::test]
async fn test_spot_create_validation() {
    let state = test_state();
    let (status, _) = send(
        &state,
        admin_request(
            "POST",
            "/api/spots",
            Some(serde_json::json!({"name": "Lot", "total_spots": 0, "hourly_price": 1.0})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_spot_update_and_delete() {
    let state = test_state();
    let spot = create_spot(&state, 4).await;

    let (status, json) = send(
        &state,
        admin_request(
            "PUT",
            &format!("/api/spots/{spot}"),
            Some(serde_json::json!({"status": "maintenance", "hourly_price": 8.5})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "maintenance");
    assert_eq!(json["hourly_price"], 8.5);

    let (status, _) = send(&state, admin_request("DELETE", &format!("/api/spots/{spot}"), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&state, public_request("GET", &format!("/api/spots/{spot}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_spot_delete_refused_with_live_bookings() {
    let state = test_state();
    let spot = create_spot(&state, 2).await;
    create_booking(&state, &spot, "confirmed").await;

    let (status, _) = send(&state, admin_request("DELETE", &format!("/api/spots/{spot}"), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ── Booking Lifecycle ──

#[tokio::test]
async fn test_full_lifecycle_restores_capacity() {
    let state = test_state();
    let spot = create_spot(&state, 1).await;
    let booking = create_booking(&state, &spot, "confirmed").await;
    assert_eq!(available(&state, &spot).await, 0);

    let (status, json) = send(&state, admin_request("POST", &format!("/api/bookings/{booking}/check"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Checked in successfully");
    assert_eq!(json["booking"]["status"], "active");
    assert_eq!(available(&state, &spot).await, 0);

    let (status, json) = send(&state, admin_request("POST", &format!("/api/bookings/{booking}/check"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Checked out successfully");
    assert_eq!(json["booking"]["status"], "completed");
    assert_eq!(json["adjustment"]["current"], 1);
    assert_eq!(available(&state, &spot).await, 1);

    let (status, json) = send(&state, admin_request("POST", &format!("/api/bookings/{booking}/check"), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("completed"));
    assert_eq!(available(&state, &spot).await, 1);
}

#[tokio::test]
async fn test_booking_price_computed_from_rate() {
    let state = test_state();
    let spot = create_spot(&state, 3).await;
    let booking = create_booking(&state, &spot, "pending").await;

    let (status, json) = send(&state, public_request("GET", &format!("/api/bookings/{booking}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_price"], 12.0);
    assert_eq!(json["parking_spot_name"], "Downtown Garage");
    assert_eq!(json["holds_slot"], false);
}

#[tokio::test]
async fn test_booking_rejects_inverted_window() {
    let state = test_state();
    let spot = create_spot(&state, 3).await;

    let (status, _) = send(
        &state,
        public_request(
            "POST",
            "/api/bookings",
            Some(serde_json::json!({
                "user_id": "user-42",
                "vehicle_id": "veh-7",
                "parking_spot_id": spot,
                "start_time": "2025-07-01T12:00:00",
                "end_time": "2025-07-01T10:00:00"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(available(&state, &spot).await, 3);
}

#[tokio::test]
async fn test_booking_full_spot_rejected() {
    let state = test_state();
    let spot = create_spot(&state, 1).await;
    create_booking(&state, &spot, "confirmed").await;

    let (status, json) = send(
        &state,
        public_request(
            "POST",
            "/api/bookings",
            Some(serde_json::json!({
                "user_id": "user-43",
                "vehicle_id": "veh-8",
                "parking_spot_id": spot,
                "start_time": "2025-07-01T10:00:00",
                "end_time": "2025-07-01T11:00:00"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("no available spots"));
}

#[tokio::test]
async fn test_cancel_pending_keeps_counter() {
    let state = test_state();
    let spot = create_spot(&state, 5).await;
    create_booking(&state, &spot, "confirmed").await;
    create_booking(&state, &spot, "confirmed").await;
    let pending = create_booking(&state, &spot, "pending").await;
    assert_eq!(available(&state, &spot).await, 3);

    let (status, json) = send(&state, public_request("POST", &format!("/api/bookings/{pending}/cancel"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["status"], "cancelled");
    assert!(json["adjustment"].is_null());
    assert_eq!(available(&state, &spot).await, 3);
}

#[tokio::test]
async fn test_cancel_confirmed_releases() {
    let state = test_state();
    let spot = create_spot(&state, 2).await;
    let booking = create_booking(&state, &spot, "confirmed").await;
    assert_eq!(available(&state, &spot).await, 1);

    let (status, _) = send(&state, public_request("POST", &format!("/api/bookings/{booking}/cancel"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(available(&state, &spot).await, 2);

    let (status, _) = send(&state, public_request("POST", &format!("/api/bookings/{booking}/cancel"), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(available(&state, &spot).await, 2);
}

#[tokio::test]
async fn test_set_status_route() {
    let state = test_state();
    let spot = create_spot(&state, 2).await;
    let booking = create_booking(&state, &spot, "pending").await;

    let (status, json) = send(
        &state,
        admin_request(
            "POST",
            &format!("/api/bookings/{booking}/status"),
            Some(serde_json::json!({"status": "confirmed"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["holds_slot"], true);
    assert_eq!(available(&state, &spot).await, 1);

    let (status, _) = send(
        &state,
        admin_request(
            "POST",
            &format!("/api/bookings/{booking}/status"),
            Some(serde_json::json!({"status": "pending"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &state,
        admin_request(
            "POST",
            &format!("/api/bookings/{booking}/status"),
            Some(serde_json::json!({"status": "parked"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_check_unknown_booking() {
    let state = test_state();
    let (status, _) = send(&state, admin_request("POST", "/api/bookings/missing/check", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_bookings_filters() {
    let state = test_state();
    let spot = create_spot(&state, 5).await;
    create_booking(&state, &spot, "confirmed").await;
    create_booking(&state, &spot, "pending").await;

    let (status, json) = send(&state, public_request("GET", "/api/bookings?status=pending", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (_, json) = send(&state, public_request("GET", "/api/bookings?user_id=user-42&limit=1", None)).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, _) = send(&state, public_request("GET", "/api/bookings?status=bogus", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_bookings_limit_is_clamped() {
    let state = test_state();
    let spot = create_spot(&state, 5).await;
    for _ in 0..3 {
        create_booking(&state, &spot, "pending").await;
    }

    let (status, json) = send(&state, public_request("GET", "/api/bookings?limit=-1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (_, json) = send(&state, public_request("GET", "/api/bookings?limit=0", None)).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (_, json) = send(&state, public_request("GET", "/api/bookings?limit=100000", None)).await;
    assert_eq!(json.as_array().unwrap().len(), 3);
}

// ── Users & Stats ──

#[tokio::test]
async fn test_stats_and_revenue() {
    let state = test_state();

    for (name, role) in [("Ana", "admin"), ("Bo", "user"), ("Cy", "user")] {
        let (status, _) = send(
            &state,
            admin_request(
                "POST",
                "/api/users",
                Some(serde_json::json!({"name": name, "email": format!("{name}@example.com"), "role": role})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let spot = create_spot(&state, 4).await;
    let booking = create_booking(&state, &spot, "confirmed").await;
    create_booking(&state, &spot, "pending").await;
    send(&state, admin_request("POST", &format!("/api/bookings/{booking}/check"), None)).await;
    send(&state, admin_request("POST", &format!("/api/bookings/{booking}/check"), None)).await;

    let (status, json) = send(&state, admin_request("GET", "/api/admin/stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_users"], 3);
    assert_eq!(json["users_by_role"]["user"], 2);
    assert_eq!(json["total_spots"], 1);
    assert_eq!(json["total_capacity"], 4);
    assert_eq!(json["total_available"], 4);
    assert_eq!(json["bookings_by_status"]["completed"], 1);
    assert_eq!(json["bookings_by_status"]["pending"], 1);
    assert_eq!(json["total_revenue"], 12.0);

    let (status, json) = send(&state, admin_request("GET", "/api/admin/revenue?days=3", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 3);

    let (_, json) = send(&state, admin_request("GET", "/api/users", None)).await;
    assert_eq!(json.as_array().unwrap().len(), 3);
}

// ── Change Feed ──

#[tokio::test]
async fn test_mutations_publish_change_events() {
    let state = test_state();
    let mut rx = state.events_tx.subscribe();

    let spot = create_spot(&state, 2).await;
    let booking = create_booking(&state, &spot, "confirmed").await;

    match rx.recv().await.unwrap() {
        ChangeEvent::SpotChanged { spot: s } => assert_eq!(s.id, spot),
        other => panic!("unexpected event: {other:?}"),
    }
    match rx.recv().await.unwrap() {
        ChangeEvent::SpotChanged { spot: s } => assert_eq!(s.available_spots, 1),
        other => panic!("unexpected event: {other:?}"),
    }
    match rx.recv().await.unwrap() {
        ChangeEvent::BookingChanged { booking: b } => assert_eq!(b.id, booking),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_events_stream_requires_token() {
    let state = test_state();
    let (status, _) = send(&state, public_request("GET", "/api/events", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
