use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use slotbook_catalog::{contains_ci, Slot, VenueSummary};
use crate::models::Booking;

/// Availability of a slot, derived from its bookings. This is the only
/// source of truth; `Slot::is_available` is a cache of `state == Open`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Open,
    /// Claimed, payment pending
    Held,
    /// Claimed and paid
    Booked,
}

impl SlotState {
    pub fn from_flags(has_active: bool, has_paid_active: bool) -> Self {
        match (has_active, has_paid_active) {
            (_, true) => SlotState::Booked,
            (true, false) => SlotState::Held,
            (false, false) => SlotState::Open,
        }
    }

    pub fn is_available(&self) -> bool {
        *self == SlotState::Open
    }

    pub fn is_booked(&self) -> bool {
        *self == SlotState::Booked
    }
}

pub fn derive_state<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> SlotState {
    let (mut active, mut paid) = (false, false);
    for booking in bookings.into_iter().filter(|b| b.is_active()) {
        active = true;
        paid |= booking.is_paid();
    }
    SlotState::from_flags(active, paid)
}

/// A slot as shown in listings: joined with its venue and derived state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotListing {
    #[serde(flatten)]
    pub slot: Slot,
    pub venue: VenueSummary,
    pub state: SlotState,
}

impl SlotListing {
    /// The cached flag and the derived state disagree
    pub fn is_inconsistent(&self) -> bool {
        self.slot.is_available != self.state.is_available()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityFilter {
    #[default]
    All,
    Available,
    /// Held or booked
    Booked,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotFilter {
    pub venue_name: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub availability: AvailabilityFilter,
    pub date: Option<NaiveDate>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

impl SlotFilter {
    pub fn matches(&self, listing: &SlotListing) -> bool {
        let availability = match self.availability {
            AvailabilityFilter::All => true,
            AvailabilityFilter::Available => listing.state.is_available(),
            AvailabilityFilter::Booked => !listing.state.is_available(),
        };

        availability
            && contains_ci(&listing.venue.name, self.venue_name.as_deref())
            && contains_ci(&listing.venue.location, self.location.as_deref())
            && self.date.map_or(true, |d| listing.slot.date == d)
            && self.min_price.map_or(true, |min| listing.slot.price >= min)
            && self.max_price.map_or(true, |max| listing.slot.price <= max)
    }

    /// Filter and order by date, then start time
    pub fn apply(&self, listings: Vec<SlotListing>) -> Vec<SlotListing> {
        let mut matched: Vec<SlotListing> = listings.into_iter().filter(|l| self.matches(l)).collect();
        matched.sort_by(|a, b| {
            (a.slot.date, a.slot.start_time).cmp(&(b.slot.date, b.slot.start_time))
        });
        matched
    }
}

/// Lowest and highest price in a result set, used to seed price-range pickers
pub fn price_bounds(listings: &[SlotListing]) -> Option<(i64, i64)> {
    let min = listings.iter().map(|l| l.slot.price).min()?;
    let max = listings.iter().map(|l| l.slot.price).max()?;
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingRequest, BookingStatus, PaymentStatus};
    use chrono::NaiveTime;
    use slotbook_catalog::NewSlot;
    use slotbook_shared::Masked;
    use uuid::Uuid;

    fn slot_on(day: u32, hour: u32, price: i64) -> Slot {
        Slot::new(Uuid::new_v4(), &NewSlot {
            venue_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 11, day).unwrap(),
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour + 3, 0, 0).unwrap(),
            price,
        })
    }

    fn listing(slot: Slot, name: &str, location: &str, state: SlotState) -> SlotListing {
        SlotListing {
            venue: VenueSummary { id: slot.venue_id, name: name.to_string(), location: location.to_string() },
            slot,
            state,
        }
    }

    fn booking(slot: &Slot) -> Booking {
        Booking::new(&BookingRequest {
            booking_id: Uuid::new_v4(),
            slot_id: slot.id,
            customer_id: Uuid::new_v4(),
            customer_name: None,
            customer_email: Masked::new("c@example.com".to_string()),
        }, slot)
    }

    #[test]
    fn test_state_derivation() {
        let slot = slot_on(2, 9, 1000);
        assert_eq!(derive_state(std::iter::empty()), SlotState::Open);

        let mut pending = booking(&slot);
        assert_eq!(derive_state([&pending]), SlotState::Held);

        pending.payment_status = PaymentStatus::Paid;
        assert_eq!(derive_state([&pending]), SlotState::Booked);
        assert!(derive_state([&pending]).is_booked());

        let mut cancelled = booking(&slot);
        cancelled.status = BookingStatus::Cancelled;
        cancelled.payment_status = PaymentStatus::Failed;
        assert_eq!(derive_state([&cancelled]), SlotState::Open);
    }

    #[test]
    fn test_completed_booking_still_holds_slot() {
        let slot = slot_on(2, 9, 1000);
        let mut b = booking(&slot);
        b.payment_status = PaymentStatus::Paid;
        b.status = BookingStatus::Completed;
        assert_eq!(derive_state([&b]), SlotState::Booked);
    }

    #[test]
    fn test_inconsistency_is_detected() {
        let mut slot = slot_on(2, 9, 1000);
        slot.is_available = true;
        let l = listing(slot, "Arena", "Pune", SlotState::Held);
        assert!(l.is_inconsistent());
    }

    #[test]
    fn test_slot_filter_combines_criteria() {
        let listings = vec![
            listing(slot_on(3, 18, 1500), "Green Turf", "Pune", SlotState::Open),
            listing(slot_on(2, 9, 800), "Green Turf", "Pune", SlotState::Booked),
            listing(slot_on(2, 6, 2000), "City Stadium", "Mumbai", SlotState::Open),
        ];

        let all = SlotFilter::default().apply(listings.clone());
        let order: Vec<(u32, u32)> = all.iter()
            .map(|l| (chrono::Datelike::day(&l.slot.date), chrono::Timelike::hour(&l.slot.start_time)))
            .collect();
        assert_eq!(order, vec![(2, 6), (2, 9), (3, 18)]);

        let filter = SlotFilter { venue_name: Some("turf".into()), availability: AvailabilityFilter::Available, ..Default::default() };
        let found = filter.apply(listings.clone());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slot.price, 1500);

        let filter = SlotFilter { availability: AvailabilityFilter::Booked, ..Default::default() };
        assert_eq!(filter.apply(listings.clone()).len(), 1);

        let filter = SlotFilter { min_price: Some(800), max_price: Some(1500), ..Default::default() };
        assert_eq!(filter.apply(listings.clone()).len(), 2);

        let filter = SlotFilter {
            location: Some("mumbai".into()),
            date: NaiveDate::from_ymd_opt(2026, 11, 2),
            ..Default::default()
        };
        assert_eq!(filter.apply(listings).len(), 1);
    }

    #[test]
    fn test_price_bounds() {
        assert_eq!(price_bounds(&[]), None);
        let listings = vec![
            listing(slot_on(2, 9, 800), "A", "X", SlotState::Open),
            listing(slot_on(2, 12, 2200), "A", "X", SlotState::Open),
            listing(slot_on(2, 15, 1200), "A", "X", SlotState::Open),
        ];
        assert_eq!(price_bounds(&listings), Some((800, 2200)));
    }
}
