use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::NaiveDate;
use slotbook_catalog::{Slot, VenueSummary};
use crate::models::{Booking, BookingStatus, PaymentStatus};

/// A booking joined with what it booked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    #[serde(flatten)]
    pub booking: Booking,
    pub slot: Slot,
    pub venue: VenueSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub venue_id: Option<Uuid>,
    pub payment_status: Option<PaymentStatus>,
    pub status: Option<BookingStatus>,
    /// Customer name, customer email or venue name
    pub search: Option<String>,
}

impl BookingFilter {
    pub fn matches(&self, record: &BookingRecord) -> bool {
        self.venue_id.map_or(true, |id| record.venue.id == id)
            && self.payment_status.map_or(true, |s| record.booking.payment_status == s)
            && self.status.map_or(true, |s| record.booking.status == s)
            && self.matches_search(record)
    }

    fn matches_search(&self, record: &BookingRecord) -> bool {
        let needle = match self.search.as_deref().map(str::trim) {
            None | Some("") => return true,
            Some(n) => n.to_lowercase(),
        };
        let name = record.booking.customer_name.as_deref().unwrap_or_default();
        [name, record.booking.customer_email.inner().as_str(), record.venue.name.as_str()]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn apply(&self, records: Vec<BookingRecord>) -> Vec<BookingRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Totals shown on the review dashboards
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevenueSummary {
    pub total_bookings: usize,
    pub paid_bookings: usize,
    pub pending_bookings: usize,
    /// Sum of paid amounts, minor units
    pub total_revenue: i64,
    /// Confirmed bookings for today or later
    pub upcoming_bookings: usize,
}

impl RevenueSummary {
    pub fn from_records(records: &[BookingRecord], today: NaiveDate) -> Self {
        let mut summary = RevenueSummary { total_bookings: records.len(), ..Default::default() };

        for record in records {
            match record.booking.payment_status {
                PaymentStatus::Paid => {
                    summary.paid_bookings += 1;
                    summary.total_revenue += record.booking.total_amount;
                }
                PaymentStatus::Pending => summary.pending_bookings += 1,
                PaymentStatus::Failed => {}
            }
            if record.booking.status == BookingStatus::Confirmed && record.slot.date >= today {
                summary.upcoming_bookings += 1;
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingRequest;
    use chrono::NaiveTime;
    use slotbook_catalog::NewSlot;
    use slotbook_shared::Masked;

    fn record(day: u32, price: i64, name: &str, email: &str, venue: &str) -> BookingRecord {
        let slot = Slot::new(Uuid::new_v4(), &NewSlot {
            venue_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 11, day).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            price,
        });
        let booking = Booking::new(&BookingRequest {
            booking_id: Uuid::new_v4(),
            slot_id: slot.id,
            customer_id: Uuid::new_v4(),
            customer_name: Some(name.to_string()),
            customer_email: Masked::new(email.to_string()),
        }, &slot);
        BookingRecord {
            venue: VenueSummary { id: slot.venue_id, name: venue.to_string(), location: "Pune".to_string() },
            slot,
            booking,
        }
    }

    #[test]
    fn test_revenue_counts_only_paid() {
        let today = NaiveDate::from_ymd_opt(2026, 11, 5).unwrap();
        let mut paid = record(10, 1500, "Asha", "asha@example.com", "Green Turf");
        paid.booking.mark_paid("ref").unwrap();
        let pending = record(4, 900, "Ravi", "ravi@example.com", "Green Turf");
        let mut failed = record(12, 700, "Meera", "meera@example.com", "City Stadium");
        failed.booking.mark_payment_failed().unwrap();

        let summary = RevenueSummary::from_records(&[paid, pending, failed], today);

        assert_eq!(summary, RevenueSummary {
            total_bookings: 3,
            paid_bookings: 1,
            pending_bookings: 1,
            total_revenue: 1500,
            upcoming_bookings: 1,
        });
    }

    #[test]
    fn test_booking_search_matches_customer_or_venue() {
        let records = vec![
            record(10, 1500, "Asha Rao", "asha@example.com", "Green Turf"),
            record(11, 900, "Ravi", "ravi@club.in", "City Stadium"),
        ];

        let by_name = BookingFilter { search: Some("asha".into()), ..Default::default() };
        assert_eq!(by_name.apply(records.clone()).len(), 1);

        let by_email = BookingFilter { search: Some("CLUB.IN".into()), ..Default::default() };
        assert_eq!(by_email.apply(records.clone())[0].booking.customer_name.as_deref(), Some("Ravi"));

        let by_venue = BookingFilter { search: Some("stadium".into()), ..Default::default() };
        assert_eq!(by_venue.apply(records.clone()).len(), 1);

        let venue_id = records[0].venue.id;
        let by_venue_id = BookingFilter { venue_id: Some(venue_id), ..Default::default() };
        assert_eq!(by_venue_id.apply(records.clone()).len(), 1);

        let paid_only = BookingFilter { payment_status: Some(PaymentStatus::Paid), ..Default::default() };
        assert!(paid_only.apply(records).is_empty());
    }
}
