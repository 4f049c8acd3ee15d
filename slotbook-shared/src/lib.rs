pub mod models;
pub mod pii;

pub use models::events::VenueEvent;
pub use pii::Masked;
