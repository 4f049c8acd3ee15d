use uuid::Uuid;
use chrono::{NaiveDate, NaiveTime};

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct SlotCreatedEvent {
    pub slot_id: Uuid,
    pub venue_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub price: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct SlotBookedEvent {
    pub slot_id: Uuid,
    pub venue_id: Uuid,
    pub booking_id: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct PaymentSettledEvent {
    pub booking_id: Uuid,
    pub slot_id: Uuid,
    pub venue_id: Uuid,
    pub amount: i64,
    pub payment_reference: String,
    pub timestamp: i64,
}

/// Emitted when a declined payment cancels the booking and re-opens the slot.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct PaymentFailedEvent {
    pub booking_id: Uuid,
    pub slot_id: Uuid,
    pub venue_id: Uuid,
    pub reason: String,
    pub timestamp: i64,
}

/// Availability changes fanned out to live subscribers of a venue.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VenueEvent {
    SlotCreated(SlotCreatedEvent),
    SlotBooked(SlotBookedEvent),
    PaymentSettled(PaymentSettledEvent),
    PaymentFailed(PaymentFailedEvent),
}

impl VenueEvent {
    pub fn venue_id(&self) -> Uuid {
        match self {
            VenueEvent::SlotCreated(e) => e.venue_id,
            VenueEvent::SlotBooked(e) => e.venue_id,
            VenueEvent::PaymentSettled(e) => e.venue_id,
            VenueEvent::PaymentFailed(e) => e.venue_id,
        }
    }

    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            VenueEvent::SlotCreated(_) => "slot_created",
            VenueEvent::SlotBooked(_) => "slot_booked",
            VenueEvent::PaymentSettled(_) => "payment_settled",
            VenueEvent::PaymentFailed(_) => "payment_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged_by_type() {
        let venue_id = Uuid::new_v4();
        let event = VenueEvent::SlotBooked(SlotBookedEvent {
            slot_id: Uuid::new_v4(),
            venue_id,
            booking_id: Uuid::new_v4(),
            timestamp: 0,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "slot_booked");
        assert_eq!(event.venue_id(), venue_id);
        assert_eq!(event.name(), "slot_booked");
    }
}
