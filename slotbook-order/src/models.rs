use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;
use slotbook_catalog::Slot;
use slotbook_shared::Masked;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Completed,
    /// Terminal; set when payment fails. A cancelled booking no longer holds its slot.
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// What a customer asks for; the amount always comes from the slot at booking time.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub booking_id: Uuid,
    pub slot_id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_email: Masked<String>,
}

/// A customer's claim on one slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_email: Masked<String>,
    pub total_amount: i64,
    pub payment_status: PaymentStatus,
    pub status: BookingStatus,
    pub payment_reference: Option<String>,
    /// Set while a settlement holds this booking; expires after the lease
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of trying to take the settlement claim on a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementClaim {
    Claimed,
    /// Another settlement holds a live claim
    InProgress,
}

impl Booking {
    pub fn new(request: &BookingRequest, slot: &Slot) -> Self {
        let now = Utc::now();
        Self {
            id: request.booking_id,
            slot_id: slot.id,
            customer_id: request.customer_id,
            customer_name: request.customer_name.clone(),
            customer_email: request.customer_email.clone(),
            total_amount: slot.price,
            payment_status: PaymentStatus::Pending,
            status: BookingStatus::Confirmed,
            payment_reference: None,
            settlement_started_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Active bookings hold their slot.
    pub fn is_active(&self) -> bool {
        matches!(self.status, BookingStatus::Confirmed | BookingStatus::Completed)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Transition: pending → paid
    pub fn mark_paid(&mut self, reference: &str) -> Result<(), InvalidTransition> {
        if self.status != BookingStatus::Confirmed || self.payment_status != PaymentStatus::Pending {
            return Err(self.invalid("paid"));
        }
        self.payment_status = PaymentStatus::Paid;
        self.payment_reference = Some(reference.to_string());
        self.settlement_started_at = None;
        self.touch();
        Ok(())
    }

    /// Transition: pending → failed, confirmed → cancelled
    pub fn mark_payment_failed(&mut self) -> Result<(), InvalidTransition> {
        if self.status != BookingStatus::Confirmed || self.payment_status != PaymentStatus::Pending {
            return Err(self.invalid("failed"));
        }
        self.payment_status = PaymentStatus::Failed;
        self.status = BookingStatus::Cancelled;
        self.settlement_started_at = None;
        self.touch();
        Ok(())
    }

    /// Only one settlement may talk to the gateway for a booking at a time.
    /// A claim older than `lease` is considered abandoned and can be taken over.
    pub fn claim_settlement(&mut self, now: DateTime<Utc>, lease: Duration) -> Result<SettlementClaim, InvalidTransition> {
        if self.status != BookingStatus::Confirmed || self.payment_status != PaymentStatus::Pending {
            return Err(self.invalid("settling"));
        }
        if let Some(started) = self.settlement_started_at {
            if now < started + lease {
                return Ok(SettlementClaim::InProgress);
            }
        }
        self.settlement_started_at = Some(now);
        self.touch();
        Ok(SettlementClaim::Claimed)
    }

    pub fn release_settlement(&mut self) {
        self.settlement_started_at = None;
        self.touch();
    }

    /// Transition: confirmed + paid → completed
    pub fn complete(&mut self) -> Result<(), InvalidTransition> {
        if self.status != BookingStatus::Confirmed || self.payment_status != PaymentStatus::Paid {
            return Err(self.invalid("completed"));
        }
        self.status = BookingStatus::Completed;
        self.touch();
        Ok(())
    }

    fn invalid(&self, to: &str) -> InvalidTransition {
        InvalidTransition {
            booking_id: self.id,
            from: format!("{}/{}", self.status, self.payment_status),
            to: to.to_string(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid booking transition for {booking_id} from {from} to {to}")]
pub struct InvalidTransition {
    pub booking_id: Uuid,
    pub from: String,
    pub to: String,
}
