use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;
use slotbook_catalog::{ensure_no_conflict, Slot, TimeRange, Venue, VenueFilter};
use crate::availability::{derive_state, SlotListing};
use crate::finance::BookingRecord;
use crate::models::{Booking, BookingRequest, SettlementClaim};
use crate::repository::{BookingRepository, SlotRepository, StoreError, VenueRepository};

#[derive(Default)]
struct Tables {
    venues: HashMap<Uuid, Venue>,
    slots: HashMap<Uuid, Slot>,
    bookings: HashMap<Uuid, Booking>,
}

impl Tables {
    fn bookings_for(&self, slot_id: Uuid) -> impl Iterator<Item = &Booking> {
        self.bookings.values().filter(move |b| b.slot_id == slot_id)
    }

    fn venue(&self, id: Uuid) -> Result<&Venue, StoreError> {
        self.venues.get(&id).ok_or_else(|| StoreError::NotFound(format!("venue {}", id)))
    }

    fn slot(&self, id: Uuid) -> Result<&Slot, StoreError> {
        self.slots.get(&id).ok_or_else(|| StoreError::NotFound(format!("slot {}", id)))
    }

    fn booking_mut(&mut self, id: Uuid) -> Result<&mut Booking, StoreError> {
        self.bookings.get_mut(&id).ok_or_else(|| StoreError::NotFound(format!("booking {}", id)))
    }

    /// Rewrite the cached flag from booking state
    fn refresh_availability(&mut self, slot_id: Uuid) {
        let state = derive_state(self.bookings_for(slot_id));
        if let Some(slot) = self.slots.get_mut(&slot_id) {
            slot.is_available = state.is_available();
        }
    }

    fn record(&self, booking: &Booking) -> Result<BookingRecord, StoreError> {
        let slot = self.slot(booking.slot_id)?.clone();
        let venue = self.venue(slot.venue_id)?.summary();
        Ok(BookingRecord { booking: booking.clone(), slot, venue })
    }
}

/// Single-process store. One lock guards all tables, which serializes every
/// check-then-write the same way the Postgres store does with row locks.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VenueRepository for InMemoryStore {
    async fn create_venue(&self, venue: &Venue) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.venues.insert(venue.id, venue.clone());
        Ok(())
    }

    async fn get_venue(&self, id: Uuid) -> Result<Option<Venue>, StoreError> {
        Ok(self.tables.lock().await.venues.get(&id).cloned())
    }

    async fn list_venues(&self, filter: &VenueFilter) -> Result<Vec<Venue>, StoreError> {
        let tables = self.tables.lock().await;
        let mut venues: Vec<Venue> = tables.venues.values().filter(|v| filter.matches(v)).cloned().collect();
        venues.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(venues)
    }
}

#[async_trait]
impl SlotRepository for InMemoryStore {
    async fn get_slot(&self, id: Uuid) -> Result<Option<Slot>, StoreError> {
        Ok(self.tables.lock().await.slots.get(&id).cloned())
    }

    async fn slots_for_venue_date(&self, venue_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, StoreError> {
        let tables = self.tables.lock().await;
        let mut slots: Vec<Slot> = tables.slots.values()
            .filter(|s| s.venue_id == venue_id && s.date == date)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn insert_slot_checked(&self, slot: &Slot) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.venue(slot.venue_id)?;

        let range = TimeRange::new(slot.start_time, slot.end_time)?;
        let existing: Vec<Slot> = tables.slots.values()
            .filter(|s| s.venue_id == slot.venue_id && s.date == slot.date)
            .cloned()
            .collect();
        ensure_no_conflict(&existing, slot.date, &range)?;

        tables.slots.insert(slot.id, slot.clone());
        Ok(())
    }

    async fn list_slot_listings(
        &self,
        venue_id: Option<Uuid>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<SlotListing>, StoreError> {
        let tables = self.tables.lock().await;
        let mut listings = Vec::new();

        for slot in tables.slots.values() {
            if venue_id.map_or(false, |id| slot.venue_id != id) || date.map_or(false, |d| slot.date != d) {
                continue;
            }
            listings.push(SlotListing {
                venue: tables.venue(slot.venue_id)?.summary(),
                state: derive_state(tables.bookings_for(slot.id)),
                slot: slot.clone(),
            });
        }

        listings.sort_by(|a, b| (a.slot.date, a.slot.start_time).cmp(&(b.slot.date, b.slot.start_time)));
        Ok(listings)
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn book_slot(&self, request: &BookingRequest) -> Result<Booking, StoreError> {
        let mut tables = self.tables.lock().await;

        let slot = tables.slot(request.slot_id)?.clone();
        let already_held = tables.bookings_for(slot.id).any(|b| b.is_active());
        if !slot.is_available || already_held {
            return Err(StoreError::SlotUnavailable(slot.id));
        }

        let booking = Booking::new(request, &slot);
        tables.bookings.insert(booking.id, booking.clone());
        tables.refresh_availability(slot.id);
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.tables.lock().await.bookings.get(&id).cloned())
    }

    async fn list_booking_records(
        &self,
        customer_id: Option<Uuid>,
        venue_id: Option<Uuid>,
    ) -> Result<Vec<BookingRecord>, StoreError> {
        let tables = self.tables.lock().await;
        let mut records = Vec::new();

        for booking in tables.bookings.values() {
            if customer_id.map_or(false, |id| booking.customer_id != id) {
                continue;
            }
            let record = tables.record(booking)?;
            if venue_id.map_or(false, |id| record.venue.id != id) {
                continue;
            }
            records.push(record);
        }

        records.sort_by(|a, b| b.booking.created_at.cmp(&a.booking.created_at));
        Ok(records)
    }

    async fn claim_settlement(&self, booking_id: Uuid, lease: Duration) -> Result<SettlementClaim, StoreError> {
        let mut tables = self.tables.lock().await;
        let booking = tables.booking_mut(booking_id)?;
        Ok(booking.claim_settlement(Utc::now(), lease)?)
    }

    async fn release_settlement(&self, booking_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.booking_mut(booking_id)?.release_settlement();
        Ok(())
    }

    async fn record_payment(&self, booking_id: Uuid, reference: &str) -> Result<Booking, StoreError> {
        let mut tables = self.tables.lock().await;
        let booking = tables.booking_mut(booking_id)?;
        booking.mark_paid(reference)?;
        Ok(booking.clone())
    }

    async fn cancel_for_failed_payment(&self, booking_id: Uuid) -> Result<Booking, StoreError> {
        let mut tables = self.tables.lock().await;
        let booking = tables.booking_mut(booking_id)?;
        booking.mark_payment_failed()?;
        let cancelled = booking.clone();
        tables.refresh_availability(cancelled.slot_id);
        Ok(cancelled)
    }

    async fn complete_booking(&self, booking_id: Uuid) -> Result<Booking, StoreError> {
        let mut tables = self.tables.lock().await;
        let booking = tables.booking_mut(booking_id)?;
        booking.complete()?;
        Ok(booking.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use slotbook_catalog::{CatalogError, NewSlot, NewVenue};
    use slotbook_shared::Masked;
    use std::sync::Arc;

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    async fn seeded() -> (InMemoryStore, Venue, Slot) {
        let store = InMemoryStore::new();
        let venue = Venue::new(Uuid::new_v4(), NewVenue {
            name: "Green Turf".to_string(),
            location: "Pune".to_string(),
            description: None,
            facilities: vec![],
        });
        store.create_venue(&venue).await.unwrap();
        let slot = Slot::new(venue.owner_id, &NewSlot {
            venue_id: venue.id,
            date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            start_time: t(10),
            end_time: t(13),
            price: 1200,
        });
        store.insert_slot_checked(&slot).await.unwrap();
        (store, venue, slot)
    }

    fn request(slot_id: Uuid) -> BookingRequest {
        BookingRequest {
            booking_id: Uuid::new_v4(),
            slot_id,
            customer_id: Uuid::new_v4(),
            customer_name: None,
            customer_email: Masked::new("c@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn test_overlapping_insert_is_rejected() {
        let (store, venue, slot) = seeded().await;
        let clash = Slot::new(venue.owner_id, &NewSlot {
            venue_id: venue.id,
            date: slot.date,
            start_time: t(12),
            end_time: t(15),
            price: 1000,
        });

        let err = store.insert_slot_checked(&clash).await.unwrap_err();
        assert!(matches!(err, StoreError::Catalog(CatalogError::Overlap { existing, .. }) if existing == slot.id));
        assert_eq!(store.slots_for_venue_date(venue.id, slot.date).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_flag_tracks_booking_state() {
        let (store, _venue, slot) = seeded().await;

        let booking = store.book_slot(&request(slot.id)).await.unwrap();
        assert!(!store.get_slot(slot.id).await.unwrap().unwrap().is_available);

        store.cancel_for_failed_payment(booking.id).await.unwrap();
        assert!(store.get_slot(slot.id).await.unwrap().unwrap().is_available);

        for listing in store.list_slot_listings(None, None).await.unwrap() {
            assert!(!listing.is_inconsistent());
        }
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let (store, _venue, slot) = seeded().await;
        let store = Arc::new(store);

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let req = request(slot.id);
                tokio::spawn(async move { store.book_slot(&req).await })
            })
            .collect();

        let mut wins = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => wins += 1,
                Err(StoreError::SlotUnavailable(id)) => assert_eq!(id, slot.id),
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(store.list_booking_records(None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_inserts_have_one_winner() {
        let (store, venue, slot) = seeded().await;
        let store = Arc::new(store);
        let date = slot.date.succ_opt().unwrap();

        // Every candidate overlaps every other, so only one may land
        let attempts: Vec<_> = (0..6)
            .map(|i| {
                let store = store.clone();
                let candidate = Slot::new(venue.owner_id, &NewSlot {
                    venue_id: venue.id,
                    date,
                    start_time: t(9 + i % 2),
                    end_time: t(12 + i % 2),
                    price: 1000,
                });
                tokio::spawn(async move { store.insert_slot_checked(&candidate).await })
            })
            .collect();

        let mut inserted = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(()) => inserted += 1,
                Err(StoreError::Catalog(CatalogError::Overlap { .. })) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.slots_for_venue_date(venue.id, date).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_settlement_claim_blocks_second_caller() {
        let (store, _venue, slot) = seeded().await;
        let booking = store.book_slot(&request(slot.id)).await.unwrap();
        let lease = chrono::Duration::seconds(30);

        assert_eq!(store.claim_settlement(booking.id, lease).await.unwrap(), SettlementClaim::Claimed);
        assert_eq!(store.claim_settlement(booking.id, lease).await.unwrap(), SettlementClaim::InProgress);

        store.release_settlement(booking.id).await.unwrap();
        assert_eq!(store.claim_settlement(booking.id, lease).await.unwrap(), SettlementClaim::Claimed);

        let paid = store.record_payment(booking.id, "pay_1").await.unwrap();
        assert!(paid.settlement_started_at.is_none());
        assert!(matches!(
            store.claim_settlement(booking.id, lease).await,
            Err(StoreError::InvalidTransition(_))
        ));
    }
}
