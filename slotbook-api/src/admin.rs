use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use slotbook_catalog::{FacilitiesInput, NewSlot, NewVenue, Slot, Venue};
use slotbook_core::Identity;
use slotbook_order::{Booking, BookingFilter, BookingRecord, RevenueSummary};
use crate::{error::AppError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateVenueRequest {
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    #[serde(default)]
    pub facilities: FacilitiesInput,
}

#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub price: i64,
}

#[derive(Debug, Serialize)]
pub struct BookingReviewResponse {
    pub bookings: Vec<BookingRecord>,
    pub summary: RevenueSummary,
    pub currency: String,
}

// ============================================================================
// Routes (behind admin_auth_middleware)
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/venues", post(create_venue))
        .route("/v1/admin/venues/{id}/slots", post(create_slot))
        .route("/v1/admin/bookings", get(review_bookings))
        .route("/v1/admin/bookings/{id}/complete", post(complete_booking))
}

async fn create_venue(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Json(req): Json<CreateVenueRequest>,
) -> Result<(StatusCode, Json<Venue>), AppError> {
    let new = NewVenue {
        name: req.name,
        location: req.location,
        description: req.description,
        facilities: req.facilities.normalize(),
    };
    let venue = state.manager.create_venue(&admin, new).await?;
    Ok((StatusCode::CREATED, Json(venue)))
}

async fn create_slot(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(venue_id): Path<Uuid>,
    Json(req): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<Slot>), AppError> {
    let new = NewSlot {
        venue_id,
        date: req.date,
        start_time: req.start_time,
        end_time: req.end_time,
        price: req.price,
    };
    let slot = state.manager.create_slot(&admin, new).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

async fn review_bookings(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<BookingReviewResponse>, AppError> {
    let (bookings, summary) = state.manager.review_bookings(&admin, &filter).await?;
    Ok(Json(BookingReviewResponse {
        bookings,
        summary,
        currency: state.booking.currency.clone(),
    }))
}

async fn complete_booking(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.manager.complete_booking(&admin, id).await?))
}
