use uuid::Uuid;
use slotbook_catalog::CatalogError;
use slotbook_core::PaymentError;
use crate::repository::StoreError;

/// Outcome taxonomy surfaced to the request boundary
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Slot {0} is not available")]
    SlotUnavailable(Uuid),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Persistence, identity or payment gateway could not be reached; retryable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Unavailable(_))
    }
}

impl From<CatalogError> for BookingError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(msg) => BookingError::Validation(msg),
            overlap @ CatalogError::Overlap { .. } => BookingError::Conflict(overlap.to_string()),
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => BookingError::NotFound(what),
            StoreError::Catalog(e) => e.into(),
            StoreError::SlotUnavailable(id) => BookingError::SlotUnavailable(id),
            StoreError::InvalidTransition(e) => BookingError::InvalidState(e.to_string()),
            StoreError::Unavailable(msg) => BookingError::Unavailable(msg),
            StoreError::Backend(msg) => BookingError::Internal(msg),
        }
    }
}

impl From<PaymentError> for BookingError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Declined(reason) => BookingError::PaymentDeclined(reason),
            other => BookingError::Unavailable(other.to_string()),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use std::time::Duration;

    #[test]
    fn test_overlap_maps_to_conflict() {
        let err: BookingError = StoreError::Catalog(CatalogError::Overlap {
            existing: Uuid::nil(),
            start: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        }).into();
        assert!(matches!(err, BookingError::Conflict(msg) if msg.contains("10:00:00-13:00:00")));
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        let err: BookingError = StoreError::Unavailable("pool timed out".into()).into();
        assert!(err.is_retryable());

        let err: BookingError = PaymentError::Timeout(Duration::from_secs(5)).into();
        assert!(err.is_retryable());

        let err: BookingError = PaymentError::Declined("card".into()).into();
        assert!(!err.is_retryable());

        let err: BookingError = StoreError::SlotUnavailable(Uuid::nil()).into();
        assert!(!err.is_retryable());
    }
}
