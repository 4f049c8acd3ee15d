use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use slotbook_core::Identity;
use slotbook_order::{price_bounds, Booking, SlotFilter, SlotListing};
use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct PriceRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Serialize)]
pub struct SlotSearchResponse {
    pub slots: Vec<SlotListing>,
    pub price_range: Option<PriceRange>,
    pub currency: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/slots", get(search_slots))
}

/// Needs an authenticated caller
pub fn customer_routes() -> Router<AppState> {
    Router::new().route("/v1/slots/{id}/book", post(book_slot))
}

async fn search_slots(
    State(state): State<AppState>,
    Query(filter): Query<SlotFilter>,
) -> Result<Json<SlotSearchResponse>, AppError> {
    let slots = state.manager.search_slots(&filter).await?;
    let price_range = price_bounds(&slots).map(|(min, max)| PriceRange { min, max });

    Ok(Json(SlotSearchResponse {
        slots,
        price_range,
        currency: state.booking.currency.clone(),
    }))
}

async fn book_slot(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(slot_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.manager.book_slot(&identity, slot_id).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}
