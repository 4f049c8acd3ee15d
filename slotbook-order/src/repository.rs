use async_trait::async_trait;
use uuid::Uuid;
use chrono::{Duration, NaiveDate};
use slotbook_catalog::{CatalogError, Slot, Venue, VenueFilter};
use crate::availability::SlotListing;
use crate::finance::BookingRecord;
use crate::models::{Booking, BookingRequest, InvalidTransition, SettlementClaim};

/// Storage-level failures. `Unavailable` is the only retryable kind.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Slot {0} is not available")]
    SlotUnavailable(Uuid),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Repository trait for venue data access
#[async_trait]
pub trait VenueRepository: Send + Sync {
    async fn create_venue(&self, venue: &Venue) -> Result<(), StoreError>;

    async fn get_venue(&self, id: Uuid) -> Result<Option<Venue>, StoreError>;

    /// Ordered by name
    async fn list_venues(&self, filter: &VenueFilter) -> Result<Vec<Venue>, StoreError>;
}

/// Repository trait for slot data access
#[async_trait]
pub trait SlotRepository: Send + Sync {
    async fn get_slot(&self, id: Uuid) -> Result<Option<Slot>, StoreError>;

    /// Ordered by start time
    async fn slots_for_venue_date(&self, venue_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, StoreError>;

    /// Insert `slot` unless it overlaps an existing slot of the same venue and
    /// date. Check and insert are serialized per venue, so two overlapping
    /// inserts cannot both succeed. Overlap is reported as `StoreError::Catalog`.
    async fn insert_slot_checked(&self, slot: &Slot) -> Result<(), StoreError>;

    /// Slots joined with their venue and availability derived from bookings
    async fn list_slot_listings(
        &self,
        venue_id: Option<Uuid>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<SlotListing>, StoreError>;
}

/// Repository trait for booking data access. Every method that changes a
/// booking's hold on its slot updates the slot's cached flag atomically with it.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Claim the slot (available → unavailable) and insert the booking as one
    /// atomic step. Fails with `SlotUnavailable` if the claim affects nothing.
    async fn book_slot(&self, request: &BookingRequest) -> Result<Booking, StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Bookings joined with slot and venue, newest first
    async fn list_booking_records(
        &self,
        customer_id: Option<Uuid>,
        venue_id: Option<Uuid>,
    ) -> Result<Vec<BookingRecord>, StoreError>;

    /// Take the exclusive right to settle a pending booking. Claims older
    /// than `lease` are treated as abandoned.
    async fn claim_settlement(&self, booking_id: Uuid, lease: Duration) -> Result<SettlementClaim, StoreError>;

    /// Drop a claim without changing payment state
    async fn release_settlement(&self, booking_id: Uuid) -> Result<(), StoreError>;

    /// pending → paid; clears the settlement claim
    async fn record_payment(&self, booking_id: Uuid, reference: &str) -> Result<Booking, StoreError>;

    /// pending → failed/cancelled, and re-open the slot
    async fn cancel_for_failed_payment(&self, booking_id: Uuid) -> Result<Booking, StoreError>;

    /// confirmed + paid → completed
    async fn complete_booking(&self, booking_id: Uuid) -> Result<Booking, StoreError>;
}
