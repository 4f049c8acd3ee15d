use axum::{
    extract::{Extension, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use slotbook_core::Identity;
use slotbook_order::{Booking, BookingFilter, BookingRecord};
use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(my_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/pay", post(pay_booking))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<BookingRecord>>, AppError> {
    Ok(Json(state.manager.customer_bookings(&identity, &filter).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.manager.get_booking(&identity, id).await?))
}

/// Settle a pending booking through the configured gateway
async fn pay_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.settlement.settle_booking(&identity, id).await?))
}
