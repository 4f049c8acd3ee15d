pub mod models;
pub mod availability;
pub mod repository;
pub mod error;
pub mod finance;
pub mod memory;
pub mod manager;
pub mod settlement;

pub use models::{Booking, BookingRequest, BookingStatus, PaymentStatus, InvalidTransition, SettlementClaim};
pub use availability::{derive_state, price_bounds, AvailabilityFilter, SlotFilter, SlotListing, SlotState};
pub use repository::{BookingRepository, SlotRepository, StoreError, VenueRepository};
pub use error::{BookingError, BookingResult};
pub use finance::{BookingFilter, BookingRecord, RevenueSummary};
pub use memory::InMemoryStore;
pub use manager::BookingManager;
pub use settlement::{PaymentSettlement, SettlementPolicy};
