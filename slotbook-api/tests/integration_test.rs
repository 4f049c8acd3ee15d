use std::sync::Arc;
use std::time::Duration;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use slotbook_api::{app, AppState, AuthConfig, Repositories};
use slotbook_core::{SimulatedGateway, SimulatedOutcome};
use slotbook_order::SettlementPolicy;
use slotbook_store::app_config::BookingConfig;
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

fn test_app(outcome: SimulatedOutcome) -> Router {
    let state = AppState::new(
        Repositories::in_memory(),
        Arc::new(SimulatedGateway::new(Duration::from_millis(5), outcome)),
        SettlementPolicy {
            gateway_timeout: Duration::from_secs(1),
            record_attempts: 3,
            record_backoff: Duration::from_millis(1),
            claim_lease: Duration::from_secs(30),
        },
        AuthConfig { secret: SECRET.to_string(), expiration: 3600, allow_dev_tokens: true },
        BookingConfig::default(),
        None,
    );
    app(state)
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, value)
}

async fn token(app: &Router, role: &str, email: &str) -> String {
    let (status, body) = send(app, "POST", "/v1/auth/dev-token", None, Some(json!({
        "email": email,
        "name": "Test Person",
        "role": role,
    }))).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn venue_with_slot(app: &Router, admin: &str) -> (String, String) {
    let (status, venue) = send(app, "POST", "/v1/admin/venues", Some(admin), Some(json!({
        "name": "City Arena",
        "location": "Mumbai",
        "description": "Indoor courts",
        "facilities": "Parking, Showers, ,Lights",
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(venue["facilities"], json!(["Parking", "Showers", "Lights"]));
    let venue_id = venue["id"].as_str().unwrap().to_string();

    let (status, slot) = send(app, "POST", &format!("/v1/admin/venues/{}/slots", venue_id), Some(admin), Some(json!({
        "date": "2026-12-05",
        "start_time": "09:00:00",
        "end_time": "12:00:00",
        "price": 1500,
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(slot["is_available"], json!(true));

    (venue_id, slot["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn test_health() {
    let app = test_app(SimulatedOutcome::Approve);
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_book_and_pay_flow() {
    let app = test_app(SimulatedOutcome::Approve);
    let admin = token(&app, "ADMIN", "owner@example.com").await;
    let customer = token(&app, "CUSTOMER", "player@example.com").await;
    let (venue_id, slot_id) = venue_with_slot(&app, &admin).await;

    let (status, booking) = send(&app, "POST", &format!("/v1/slots/{}/book", slot_id), Some(&customer), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["payment_status"], "pending");
    assert_eq!(booking["total_amount"], 1500);
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (_, slots) = send(&app, "GET", &format!("/v1/venues/{}/slots?date=2026-12-05", venue_id), None, None).await;
    assert_eq!(slots[0]["is_available"], json!(false));
    assert_eq!(slots[0]["state"], "held");

    let (status, paid) = send(&app, "POST", &format!("/v1/bookings/{}/pay", booking_id), Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["payment_status"], "paid");
    assert!(paid["payment_reference"].as_str().is_some_and(|r| r.starts_with("sim_pay_")));

    let (_, slots) = send(&app, "GET", &format!("/v1/venues/{}/slots", venue_id), None, None).await;
    assert_eq!(slots[0]["state"], "booked");

    let (status, mine) = send(&app, "GET", "/v1/bookings", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["venue"]["name"], "City Arena");

    let (status, review) = send(&app, "GET", "/v1/admin/bookings?payment_status=paid", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(review["summary"]["total_revenue"], 1500);
    assert_eq!(review["summary"]["paid_bookings"], 1);

    let (status, done) = send(&app, "POST", &format!("/v1/admin/bookings/{}/complete", booking_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "completed");
}

#[tokio::test]
async fn test_overlapping_slot_conflicts() {
    let app = test_app(SimulatedOutcome::Approve);
    let admin = token(&app, "ADMIN", "owner@example.com").await;
    let (venue_id, _) = venue_with_slot(&app, &admin).await;
    let uri = format!("/v1/admin/venues/{}/slots", venue_id);

    let (status, body) = send(&app, "POST", &uri, Some(&admin), Some(json!({
        "date": "2026-12-05", "start_time": "11:00:00", "end_time": "14:00:00", "price": 1500,
    }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("overlaps"));

    let (status, _) = send(&app, "POST", &uri, Some(&admin), Some(json!({
        "date": "2026-12-05", "start_time": "12:00:00", "end_time": "15:00:00", "price": 1500,
    }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, "POST", &uri, Some(&admin), Some(json!({
        "date": "2026-12-05", "start_time": "18:00:00", "end_time": "16:00:00", "price": 1500,
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_double_booking_conflicts() {
    let app = test_app(SimulatedOutcome::Approve);
    let admin = token(&app, "ADMIN", "owner@example.com").await;
    let first = token(&app, "CUSTOMER", "first@example.com").await;
    let second = token(&app, "CUSTOMER", "second@example.com").await;
    let (_, slot_id) = venue_with_slot(&app, &admin).await;
    let uri = format!("/v1/slots/{}/book", slot_id);

    let (status, _) = send(&app, "POST", &uri, Some(&first), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", &uri, Some(&second), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["retryable"], json!(false));
}

#[tokio::test]
async fn test_declined_payment_reopens_slot() {
    let app = test_app(SimulatedOutcome::Decline);
    let admin = token(&app, "ADMIN", "owner@example.com").await;
    let customer = token(&app, "CUSTOMER", "player@example.com").await;
    let (_, slot_id) = venue_with_slot(&app, &admin).await;

    let (_, booking) = send(&app, "POST", &format!("/v1/slots/{}/book", slot_id), Some(&customer), None).await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, _) = send(&app, "POST", &format!("/v1/bookings/{}/pay", booking_id), Some(&customer), None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (_, search) = send(&app, "GET", "/v1/slots?availability=available", None, None).await;
    assert_eq!(search["slots"].as_array().unwrap().len(), 1);
    assert_eq!(search["price_range"]["min"], 1500);

    let (status, _) = send(&app, "POST", &format!("/v1/slots/{}/book", slot_id), Some(&customer), None).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_auth_guards() {
    let app = test_app(SimulatedOutcome::Approve);
    let customer = token(&app, "CUSTOMER", "player@example.com").await;

    let (status, _) = send(&app, "GET", "/v1/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/v1/bookings", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/v1/admin/venues", Some(&customer), Some(json!({
        "name": "Sneaky", "location": "Nowhere",
    }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Browsing stays public
    let (status, venues) = send(&app, "GET", "/v1/venues", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(venues, json!([]));
}

#[tokio::test]
async fn test_foreign_booking_is_hidden() {
    let app = test_app(SimulatedOutcome::Approve);
    let admin = token(&app, "ADMIN", "owner@example.com").await;
    let owner = token(&app, "CUSTOMER", "owner-customer@example.com").await;
    let stranger = token(&app, "CUSTOMER", "stranger@example.com").await;
    let (_, slot_id) = venue_with_slot(&app, &admin).await;

    let (_, booking) = send(&app, "POST", &format!("/v1/slots/{}/book", slot_id), Some(&owner), None).await;
    let uri = format!("/v1/bookings/{}", booking["id"].as_str().unwrap());

    let (status, _) = send(&app, "GET", &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
}
