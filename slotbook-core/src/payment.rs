use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::Utc;
use std::fmt;
use std::time::Duration;

/// Gateway-issued proof of a settled payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PaymentReference(pub String);

impl PaymentReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),
    #[error("Payment gateway timed out after {0:?}")]
    Timeout(Duration),
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
}

impl PaymentError {
    /// A declined payment is final; everything else may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PaymentError::Declined(_))
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Settle `amount` (minor currency units) for a booking
    async fn settle(&self, booking_id: Uuid, amount: i64) -> Result<PaymentReference, PaymentError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulatedOutcome {
    Approve,
    Decline,
}

/// Stand-in gateway with artificial latency and a configured outcome.
pub struct SimulatedGateway {
    delay: Duration,
    outcome: SimulatedOutcome,
}

impl SimulatedGateway {
    pub fn new(delay: Duration, outcome: SimulatedOutcome) -> Self {
        Self { delay, outcome }
    }

    pub fn approving(delay: Duration) -> Self {
        Self::new(delay, SimulatedOutcome::Approve)
    }

    fn reference_for(booking_id: Uuid) -> PaymentReference {
        let id = booking_id.to_string();
        PaymentReference(format!("sim_pay_{}_{}", Utc::now().timestamp_millis(), &id[..8]))
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn settle(&self, booking_id: Uuid, amount: i64) -> Result<PaymentReference, PaymentError> {
        tracing::info!("Simulating settlement of {} for booking {}", amount, booking_id);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.outcome {
            SimulatedOutcome::Approve => Ok(Self::reference_for(booking_id)),
            SimulatedOutcome::Decline => Err(PaymentError::Declined("simulated decline".to_string())),
        }
    }
}
