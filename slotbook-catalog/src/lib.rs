pub mod venue;
pub mod slot;

pub use venue::{Venue, NewVenue, VenueFilter, VenueSummary, FacilitiesInput, contains_ci};
pub use slot::{Slot, NewSlot, TimeRange, find_conflict, ensure_no_conflict, DEFAULT_SLOT_DURATION_MINUTES};

use chrono::NaiveTime;
use uuid::Uuid;

/// Catalog-level errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Slot overlaps existing slot {existing} ({start}-{end})")]
    Overlap {
        existing: Uuid,
        start: NaiveTime,
        end: NaiveTime,
    },
}
