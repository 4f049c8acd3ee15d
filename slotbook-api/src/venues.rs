use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use slotbook_catalog::{Venue, VenueFilter};
use slotbook_order::SlotListing;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct VenueSlotsQuery {
    pub date: Option<NaiveDate>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/venues", get(list_venues))
        .route("/v1/venues/{id}", get(get_venue))
        .route("/v1/venues/{id}/slots", get(venue_slots))
}

async fn list_venues(
    State(state): State<AppState>,
    Query(filter): Query<VenueFilter>,
) -> Result<Json<Vec<Venue>>, AppError> {
    Ok(Json(state.manager.list_venues(&filter).await?))
}

async fn get_venue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Venue>, AppError> {
    Ok(Json(state.manager.get_venue(id).await?))
}

async fn venue_slots(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<VenueSlotsQuery>,
) -> Result<Json<Vec<SlotListing>>, AppError> {
    Ok(Json(state.manager.slots_for_venue(id, query.date).await?))
}
