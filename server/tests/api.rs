use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use parking_server::config::Config;
use parking_server::routes::create_routes;
use parking_server::services::FixedClock;
use parking_server::store::MemoryStore;
use parking_server::AppState;

struct Caller {
    id: Uuid,
    admin: bool,
}

impl Caller {
    fn user() -> Self {
        Self {
            id: Uuid::new_v4(),
            admin: false,
        }
    }

    fn admin() -> Self {
        Self {
            id: Uuid::new_v4(),
            admin: true,
        }
    }
}

fn app() -> Router {
    let config = Config::from_lookup(|_| None).unwrap();
    // 2024-01-01T10:00 at the default +05:30 offset.
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 4, 30, 0).unwrap());
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        config.civil_zone,
        Arc::new(clock),
    );
    create_routes(state, &config)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    caller: Option<&Caller>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header("x-user-id", caller.id.to_string());
        if caller.admin {
            builder = builder.header("x-user-role", "admin");
        }
    }
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&v).unwrap())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create_lot(app: &Router, admin: &Caller, name: &str, capacity: i32) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/lots",
        Some(admin),
        Some(json!({
            "name": name,
            "address": "456 Park Avenue, Midtown District",
            "postal_code": "654321",
            "hourly_rate": "20.00",
            "capacity": capacity,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_storage() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["storage"], "memory");
    assert_eq!(body["data"]["lots"], 0);
}

#[tokio::test]
async fn identity_is_required() {
    let app = app();
    let (status, body) = call(&app, "GET", "/lots", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn only_admins_create_lots() {
    let app = app();
    let (status, body) = call(
        &app,
        "POST",
        "/lots",
        Some(&Caller::user()),
        Some(json!({
            "name": "Central Mall Parking",
            "address": "123 Main Street",
            "postal_code": "123456",
            "hourly_rate": 25,
            "capacity": 5,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn lot_detail_lists_labelled_spots() {
    let app = app();
    let admin = Caller::admin();
    let lot_id = create_lot(&app, &admin, "City Center Garage", 12).await;

    let (status, body) = call(&app, "GET", &format!("/lots/{lot_id}"), Some(&Caller::user()), None).await;
    assert_eq!(status, StatusCode::OK);
    let labels: Vec<&str> = body["data"]["spots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels.len(), 12);
    assert_eq!(labels[10..], ["B1", "B2"]);
    assert_eq!(body["data"]["occupancy_percentage"], 0.0);
}

#[tokio::test]
async fn book_preview_and_release() {
    let app = app();
    let admin = Caller::admin();
    let driver = Caller::user();
    let lot_id = create_lot(&app, &admin, "City Center Garage", 1).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/lots/{lot_id}/reservations"),
        Some(&driver),
        Some(json!({ "vehicle_number": "ka 01 ab 1234" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let reservation_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["vehicle_number"], "KA 01 AB 1234");
    assert!(body["data"]["end_time"].is_null());

    // Lot is now full.
    let (status, body) = call(
        &app,
        "POST",
        &format!("/lots/{lot_id}/reservations"),
        Some(&Caller::user()),
        Some(json!({ "vehicle_number": "DL 1 C 2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "STATE_CONFLICT");

    let (status, body) = call(
        &app,
        "GET",
        &format!("/reservations/{reservation_id}/preview?at=2024-01-01T12:30"),
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cost"], "50.00");
    assert_eq!(body["data"]["duration"], "2h 30m");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/reservations/{reservation_id}/release"),
        Some(&Caller::user()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/reservations/{reservation_id}/release"),
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_cost"], "10.00");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/reservations/{reservation_id}/release"),
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&app, "GET", "/reservations", Some(&driver), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["spot_label"], "A1");
    assert_eq!(history[0]["lot_name"], "City Center Garage");
    assert_eq!(history[0]["duration"], "0m");
}

#[tokio::test]
async fn occupied_lot_cannot_be_deleted() {
    let app = app();
    let admin = Caller::admin();
    let lot_id = create_lot(&app, &admin, "Airport Parking Zone", 2).await;
    let (status, _) = call(
        &app,
        "POST",
        &format!("/lots/{lot_id}/reservations"),
        Some(&Caller::user()),
        Some(json!({ "vehicle_number": "MH 12 XY 9" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(&app, "DELETE", &format!("/lots/{lot_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&app, "GET", &format!("/lots/{lot_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["occupied_spots"], 1);
    assert_eq!(body["data"]["occupancy_percentage"], 50.0);
}

#[tokio::test]
async fn preview_rejects_bad_timestamp() {
    let app = app();
    let admin = Caller::admin();
    let driver = Caller::user();
    let lot_id = create_lot(&app, &admin, "Shopping Complex Parking", 1).await;
    let (_, body) = call(
        &app,
        "POST",
        &format!("/lots/{lot_id}/reservations"),
        Some(&driver),
        Some(json!({ "vehicle_number": "TN 22 Z 1" })),
    )
    .await;
    let reservation_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        "GET",
        &format!("/reservations/{reservation_id}/preview?at=tomorrow"),
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "GET",
        &format!("/reservations/{reservation_id}/preview?at=-262143-01-01T00:00"),
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = call(
        &app,
        "GET",
        &format!("/reservations/{reservation_id}/preview?at=2024-01-01T09:00"),
        Some(&driver),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
