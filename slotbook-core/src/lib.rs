pub mod identity;
pub mod payment;

pub use identity::{Identity, IdentityProvider, Role};
pub use payment::{PaymentError, PaymentGateway, PaymentReference, SimulatedGateway, SimulatedOutcome};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal service error: {0}")]
    InternalError(String),
    #[error("Identity verification failed: {0}")]
    IdentityError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
