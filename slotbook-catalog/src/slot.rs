use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use crate::CatalogError;

/// Slots are sold in three-hour blocks by convention. Creation reports
/// deviations but does not reject them.
pub const DEFAULT_SLOT_DURATION_MINUTES: i64 = 180;

/// Half-open `[start, end)` time-of-day range
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TimeRange {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, CatalogError> {
        if start >= end {
            return Err(CatalogError::Validation(format!(
                "start time {} must be before end time {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Adjacent ranges (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub price: i64,
    /// Cached availability; always written in the same transaction as the
    /// booking change that affects it.
    pub is_available: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn new(created_by: Uuid, new: &NewSlot) -> Self {
        Self {
            id: Uuid::new_v4(),
            venue_id: new.venue_id,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            price: new.price,
            is_available: true,
            created_by,
            created_at: Utc::now(),
        }
    }

    /// Stored slots are not re-validated; a degenerate legacy range simply never overlaps.
    pub fn overlaps(&self, date: NaiveDate, range: &TimeRange) -> bool {
        self.date == date && range.start < self.end_time && range.end > self.start_time
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSlot {
    pub venue_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub price: i64,
}

impl NewSlot {
    pub fn validate(&self) -> Result<TimeRange, CatalogError> {
        if self.price < 0 {
            return Err(CatalogError::Validation("price must not be negative".to_string()));
        }
        TimeRange::new(self.start_time, self.end_time)
    }

    pub fn follows_default_duration(&self) -> bool {
        (self.end_time - self.start_time).num_minutes() == DEFAULT_SLOT_DURATION_MINUTES
    }
}

/// First existing slot on `date` that overlaps `proposed`, if any
pub fn find_conflict<'a>(existing: &'a [Slot], date: NaiveDate, proposed: &TimeRange) -> Option<&'a Slot> {
    existing.iter().find(|slot| slot.overlaps(date, proposed))
}

/// `find_conflict` as an error, for callers that want to `?` it
pub fn ensure_no_conflict(existing: &[Slot], date: NaiveDate, proposed: &TimeRange) -> Result<(), CatalogError> {
    match find_conflict(existing, date, proposed) {
        Some(slot) => Err(CatalogError::Overlap {
            existing: slot.id,
            start: slot.start_time,
            end: slot.end_time,
        }),
        None => Ok(()),
    }
}
