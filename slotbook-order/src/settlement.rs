use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;
use slotbook_core::{Identity, PaymentError, PaymentGateway};
use slotbook_shared::models::events::{PaymentFailedEvent, PaymentSettledEvent};
use slotbook_shared::VenueEvent;
use crate::error::{BookingError, BookingResult};
use crate::models::{Booking, BookingStatus, PaymentStatus, SettlementClaim};
use crate::repository::{BookingRepository, SlotRepository, StoreError};

/// Timeouts and retry budget for settling payments
#[derive(Debug, Clone)]
pub struct SettlementPolicy {
    pub gateway_timeout: Duration,
    pub record_attempts: u32,
    pub record_backoff: Duration,
    /// How long a settlement claim shuts out other attempts
    pub claim_lease: Duration,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_secs(10),
            record_attempts: 5,
            record_backoff: Duration::from_millis(200),
            claim_lease: Duration::from_secs(30),
        }
    }
}

/// Drives a pending booking to paid (or cancelled) through a payment gateway.
#[derive(Clone)]
pub struct PaymentSettlement {
    bookings: Arc<dyn BookingRepository>,
    slots: Arc<dyn SlotRepository>,
    gateway: Arc<dyn PaymentGateway>,
    policy: SettlementPolicy,
    events: broadcast::Sender<VenueEvent>,
}

impl PaymentSettlement {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        slots: Arc<dyn SlotRepository>,
        gateway: Arc<dyn PaymentGateway>,
        policy: SettlementPolicy,
        events: broadcast::Sender<VenueEvent>,
    ) -> Self {
        Self { bookings, slots, gateway, policy, events }
    }

    pub async fn settle_booking(&self, actor: &Identity, booking_id: Uuid) -> BookingResult<Booking> {
        let booking = self.bookings.get_booking(booking_id).await?
            .filter(|b| b.customer_id == actor.id || actor.is_administrator())
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))?;

        match (booking.status, booking.payment_status) {
            (_, PaymentStatus::Paid) => {
                info!("Booking {} already paid, nothing to settle", booking_id);
                return Ok(booking);
            }
            (BookingStatus::Confirmed, PaymentStatus::Pending) => {}
            (status, payment) => {
                return Err(BookingError::InvalidState(format!(
                    "booking {} is {}/{} and cannot be paid",
                    booking_id, status, payment
                )));
            }
        }

        // One caller at a time may talk to the gateway for a booking
        let lease = chrono::Duration::from_std(self.policy.claim_lease)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        match self.bookings.claim_settlement(booking_id, lease).await {
            Ok(SettlementClaim::Claimed) => {}
            Ok(SettlementClaim::InProgress) => {
                info!("Settlement of booking {} already in progress", booking_id);
                return Err(BookingError::Conflict(format!(
                    "payment for booking {} is already being settled",
                    booking_id
                )));
            }
            Err(StoreError::InvalidTransition(e)) => {
                return match self.bookings.get_booking(booking_id).await? {
                    Some(b) if b.is_paid() => Ok(b),
                    _ => Err(BookingError::InvalidState(e.to_string())),
                };
            }
            Err(e) => return Err(e.into()),
        }

        let outcome = tokio::time::timeout(
            self.policy.gateway_timeout,
            self.gateway.settle(booking.id, booking.total_amount),
        )
        .await
        .unwrap_or(Err(PaymentError::Timeout(self.policy.gateway_timeout)));

        match outcome {
            Ok(reference) => {
                info!("Payment {} captured for booking {}", reference, booking_id);
                let paid = self.record_paid(booking_id, reference.as_str()).await?;
                self.publish_settled(&paid).await;
                Ok(paid)
            }
            Err(PaymentError::Declined(reason)) => {
                warn!("Payment declined for booking {}: {}", booking_id, reason);
                let cancelled = self.bookings.cancel_for_failed_payment(booking_id).await?;
                self.publish_failed(&cancelled, &reason).await;
                Err(BookingError::PaymentDeclined(reason))
            }
            Err(other) => {
                // Booking stays pending; the caller may retry.
                warn!("Payment for booking {} not settled: {}", booking_id, other);
                if let Err(e) = self.bookings.release_settlement(booking_id).await {
                    warn!("Could not release settlement claim on booking {}: {}", booking_id, e);
                }
                Err(other.into())
            }
        }
    }

    /// The gateway has taken the money, so recording it is retried with backoff.
    async fn record_paid(&self, booking_id: Uuid, reference: &str) -> BookingResult<Booking> {
        let recorded = retry_with_backoff(self.policy.record_attempts, self.policy.record_backoff, || {
            self.bookings.record_payment(booking_id, reference)
        })
        .await;

        match recorded {
            Ok(booking) => Ok(booking),
            Err(StoreError::InvalidTransition(e)) => {
                // A concurrent settlement may have won the race
                match self.bookings.get_booking(booking_id).await? {
                    Some(b) if b.is_paid() => Ok(b),
                    _ => Err(BookingError::InvalidState(e.to_string())),
                }
            }
            Err(e) => {
                // Claim stays in place until the lease runs out
                error!("Payment {} for booking {} captured but not recorded: {}", reference, booking_id, e);
                Err(e.into())
            }
        }
    }

    async fn venue_of(&self, booking: &Booking) -> Option<Uuid> {
        match self.slots.get_slot(booking.slot_id).await {
            Ok(slot) => slot.map(|s| s.venue_id),
            Err(e) => {
                warn!("Could not resolve venue for booking {}: {}", booking.id, e);
                None
            }
        }
    }

    async fn publish_settled(&self, booking: &Booking) {
        if let Some(venue_id) = self.venue_of(booking).await {
            let _ = self.events.send(VenueEvent::PaymentSettled(PaymentSettledEvent {
                booking_id: booking.id,
                slot_id: booking.slot_id,
                venue_id,
                amount: booking.total_amount,
                payment_reference: booking.payment_reference.clone().unwrap_or_default(),
                timestamp: Utc::now().timestamp(),
            }));
        }
    }

    async fn publish_failed(&self, booking: &Booking, reason: &str) {
        if let Some(venue_id) = self.venue_of(booking).await {
            let _ = self.events.send(VenueEvent::PaymentFailed(PaymentFailedEvent {
                booking_id: booking.id,
                slot_id: booking.slot_id,
                venue_id,
                reason: reason.to_string(),
                timestamp: Utc::now().timestamp(),
            }));
        }
    }
}

/// Retry `op` while it fails with a retryable store error, doubling the delay each time.
pub async fn retry_with_backoff<T, F, Fut>(attempts: u32, base: Duration, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = attempts.max(1);
    let mut delay = base;
    let mut attempt = 1;

    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!("Attempt {}/{} failed: {}; retrying in {:?}", attempt, attempts, e, delay);
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            result => return result,
        }
    }
}
