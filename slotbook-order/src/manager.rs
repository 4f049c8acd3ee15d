use std::sync::Arc;
use chrono::{NaiveDate, Utc};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;
use slotbook_catalog::{ensure_no_conflict, NewSlot, NewVenue, Slot, Venue, VenueFilter};
use slotbook_core::Identity;
use slotbook_shared::models::events::{SlotBookedEvent, SlotCreatedEvent};
use slotbook_shared::VenueEvent;
use crate::availability::{SlotFilter, SlotListing};
use crate::error::{BookingError, BookingResult};
use crate::finance::{BookingFilter, BookingRecord, RevenueSummary};
use crate::models::{Booking, BookingRequest};
use crate::repository::{BookingRepository, SlotRepository, VenueRepository};

/// Venue, slot and booking operations behind the request boundary.
#[derive(Clone)]
pub struct BookingManager {
    venues: Arc<dyn VenueRepository>,
    slots: Arc<dyn SlotRepository>,
    bookings: Arc<dyn BookingRepository>,
    events: broadcast::Sender<VenueEvent>,
}

impl BookingManager {
    pub fn new(
        venues: Arc<dyn VenueRepository>,
        slots: Arc<dyn SlotRepository>,
        bookings: Arc<dyn BookingRepository>,
        events: broadcast::Sender<VenueEvent>,
    ) -> Self {
        Self { venues, slots, bookings, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VenueEvent> {
        self.events.subscribe()
    }

    // ------------------------------------------------------------------
    // Venues
    // ------------------------------------------------------------------

    pub async fn create_venue(&self, actor: &Identity, new: NewVenue) -> BookingResult<Venue> {
        require_admin(actor)?;
        new.validate()?;

        let venue = Venue::new(actor.id, new);
        self.venues.create_venue(&venue).await?;

        info!("Venue created: {} ({}) by {}", venue.name, venue.id, actor.id);
        Ok(venue)
    }

    pub async fn get_venue(&self, venue_id: Uuid) -> BookingResult<Venue> {
        self.venues.get_venue(venue_id).await?
            .ok_or_else(|| BookingError::NotFound(format!("venue {}", venue_id)))
    }

    pub async fn list_venues(&self, filter: &VenueFilter) -> BookingResult<Vec<Venue>> {
        Ok(self.venues.list_venues(filter).await?)
    }

    // ------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------

    /// Create a slot unless it overlaps an existing slot for the same venue and date.
    pub async fn create_slot(&self, actor: &Identity, new: NewSlot) -> BookingResult<Slot> {
        require_admin(actor)?;
        let range = new.validate()?;

        let venue = self.get_venue(new.venue_id).await?;
        if !venue.is_owned_by(actor.id) {
            return Err(BookingError::Forbidden(format!("venue {} belongs to another administrator", venue.id)));
        }

        // Early rejection with a clear message; a failed lookup blocks creation.
        let existing = self.slots.slots_for_venue_date(venue.id, new.date).await?;
        if let Err(conflict) = ensure_no_conflict(&existing, new.date, &range) {
            warn!("Rejected overlapping slot for venue {} on {}: {}", venue.id, new.date, conflict);
            return Err(conflict.into());
        }

        if !new.follows_default_duration() {
            warn!(
                "Slot for venue {} runs {} minutes instead of the usual three hours",
                venue.id,
                range.duration_minutes()
            );
        }

        // Authoritative check happens under the store's per-venue lock.
        let slot = Slot::new(actor.id, &new);
        self.slots.insert_slot_checked(&slot).await?;

        info!("Slot created: {} for venue {} on {} {}-{}", slot.id, venue.id, slot.date, slot.start_time, slot.end_time);
        self.publish(VenueEvent::SlotCreated(SlotCreatedEvent {
            slot_id: slot.id,
            venue_id: slot.venue_id,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            price: slot.price,
            timestamp: Utc::now().timestamp(),
        }));

        Ok(slot)
    }

    pub async fn slots_for_venue(&self, venue_id: Uuid, date: Option<NaiveDate>) -> BookingResult<Vec<SlotListing>> {
        self.get_venue(venue_id).await?;
        Ok(self.slots.list_slot_listings(Some(venue_id), date).await?)
    }

    pub async fn search_slots(&self, filter: &SlotFilter) -> BookingResult<Vec<SlotListing>> {
        let listings = self.slots.list_slot_listings(None, filter.date).await?;
        Ok(filter.apply(listings))
    }

    // ------------------------------------------------------------------
    // Bookings
    // ------------------------------------------------------------------

    /// Transition a slot from available to taken on behalf of `customer`.
    pub async fn book_slot(&self, customer: &Identity, slot_id: Uuid) -> BookingResult<Booking> {
        let slot = self.slots.get_slot(slot_id).await?
            .ok_or_else(|| BookingError::NotFound(format!("slot {}", slot_id)))?;

        if !slot.is_available {
            warn!("Booking rejected, slot {} already taken", slot_id);
            return Err(BookingError::SlotUnavailable(slot_id));
        }

        let request = BookingRequest {
            booking_id: Uuid::new_v4(),
            slot_id,
            customer_id: customer.id,
            customer_name: customer.profile.full_name.clone(),
            customer_email: customer.email.clone(),
        };

        // The store re-checks availability atomically with the insert.
        let booking = self.bookings.book_slot(&request).await.map_err(|e| {
            warn!("Booking of slot {} by {} failed: {}", slot_id, customer.id, e);
            BookingError::from(e)
        })?;

        info!("Slot {} booked: booking {} for {} ({})", slot_id, booking.id, customer.id, booking.total_amount);
        self.publish(VenueEvent::SlotBooked(SlotBookedEvent {
            slot_id,
            venue_id: slot.venue_id,
            booking_id: booking.id,
            timestamp: Utc::now().timestamp(),
        }));

        Ok(booking)
    }

    /// Customers see their own bookings; administrators see all.
    pub async fn get_booking(&self, actor: &Identity, booking_id: Uuid) -> BookingResult<Booking> {
        let booking = self.bookings.get_booking(booking_id).await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))?;

        if booking.customer_id != actor.id && !actor.is_administrator() {
            // Not leaking existence
            return Err(BookingError::NotFound(format!("booking {}", booking_id)));
        }
        Ok(booking)
    }

    pub async fn customer_bookings(&self, customer: &Identity, filter: &BookingFilter) -> BookingResult<Vec<BookingRecord>> {
        let records = self.bookings.list_booking_records(Some(customer.id), filter.venue_id).await?;
        Ok(filter.apply(records))
    }

    /// Admin review: filtered bookings and the totals over them
    pub async fn review_bookings(
        &self,
        actor: &Identity,
        filter: &BookingFilter,
    ) -> BookingResult<(Vec<BookingRecord>, RevenueSummary)> {
        require_admin(actor)?;
        let records = filter.apply(self.bookings.list_booking_records(None, filter.venue_id).await?);
        let summary = RevenueSummary::from_records(&records, Utc::now().date_naive());
        Ok((records, summary))
    }

    pub async fn complete_booking(&self, actor: &Identity, booking_id: Uuid) -> BookingResult<Booking> {
        require_admin(actor)?;
        let booking = self.bookings.complete_booking(booking_id).await?;
        info!("Booking {} completed by {}", booking_id, actor.id);
        Ok(booking)
    }

    fn publish(&self, event: VenueEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

pub(crate) fn require_admin(actor: &Identity) -> BookingResult<()> {
    if actor.is_administrator() {
        Ok(())
    } else {
        Err(BookingError::Forbidden("administrator role required".to_string()))
    }
}
