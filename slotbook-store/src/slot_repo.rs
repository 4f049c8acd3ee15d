use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use slotbook_catalog::{ensure_no_conflict, Slot, TimeRange, VenueSummary};
use slotbook_order::{SlotListing, SlotRepository, SlotState, StoreError};
use crate::database::db_err;

pub(crate) const SLOT_COLUMNS: &str =
    "id, venue_id, date, start_time, end_time, price, is_available, created_by, created_at";

pub struct PgSlotRepository {
    pool: PgPool,
}

impl PgSlotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SlotRow {
    id: Uuid,
    venue_id: Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    price: i64,
    is_available: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl From<SlotRow> for Slot {
    fn from(row: SlotRow) -> Self {
        Slot {
            id: row.id,
            venue_id: row.venue_id,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            price: row.price,
            is_available: row.is_available,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    slot: SlotRow,
    venue_name: String,
    venue_location: String,
    has_active: bool,
    has_paid_active: bool,
}

impl From<ListingRow> for SlotListing {
    fn from(row: ListingRow) -> Self {
        let venue = VenueSummary {
            id: row.slot.venue_id,
            name: row.venue_name,
            location: row.venue_location,
        };
        SlotListing {
            slot: row.slot.into(),
            venue,
            state: SlotState::from_flags(row.has_active, row.has_paid_active),
        }
    }
}

#[async_trait]
impl SlotRepository for PgSlotRepository {
    async fn get_slot(&self, id: Uuid) -> Result<Option<Slot>, StoreError> {
        let row = sqlx::query_as::<_, SlotRow>(&format!("SELECT {} FROM slots WHERE id = $1", SLOT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.map(Slot::from))
    }

    async fn slots_for_venue_date(&self, venue_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, StoreError> {
        let rows = sqlx::query_as::<_, SlotRow>(&format!(
            "SELECT {} FROM slots WHERE venue_id = $1 AND date = $2 ORDER BY start_time",
            SLOT_COLUMNS
        ))
        .bind(venue_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Slot::from).collect())
    }

    async fn insert_slot_checked(&self, slot: &Slot) -> Result<(), StoreError> {
        let range = TimeRange::new(slot.start_time, slot.end_time)?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Serializes slot creation per venue
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM venues WHERE id = $1 FOR UPDATE")
            .bind(slot.venue_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if locked.is_none() {
            return Err(StoreError::NotFound(format!("venue {}", slot.venue_id)));
        }

        let existing: Vec<Slot> = sqlx::query_as::<_, SlotRow>(&format!(
            "SELECT {} FROM slots WHERE venue_id = $1 AND date = $2",
            SLOT_COLUMNS
        ))
        .bind(slot.venue_id)
        .bind(slot.date)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(Slot::from)
        .collect();

        ensure_no_conflict(&existing, slot.date, &range)?;

        sqlx::query(
            r#"
            INSERT INTO slots (id, venue_id, date, start_time, end_time, price, is_available, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(slot.id)
        .bind(slot.venue_id)
        .bind(slot.date)
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(slot.price)
        .bind(slot.is_available)
        .bind(slot.created_by)
        .bind(slot.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        info!("Slot {} stored for venue {} on {}", slot.id, slot.venue_id, slot.date);
        Ok(())
    }

    async fn list_slot_listings(
        &self,
        venue_id: Option<Uuid>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<SlotListing>, StoreError> {
        let rows = sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT s.id, s.venue_id, s.date, s.start_time, s.end_time, s.price, s.is_available,
                   s.created_by, s.created_at,
                   v.name AS venue_name, v.location AS venue_location,
                   EXISTS (
                       SELECT 1 FROM bookings b
                       WHERE b.slot_id = s.id AND b.status <> 'cancelled'
                   ) AS has_active,
                   EXISTS (
                       SELECT 1 FROM bookings b
                       WHERE b.slot_id = s.id AND b.status <> 'cancelled' AND b.payment_status = 'paid'
                   ) AS has_paid_active
            FROM slots s
            JOIN venues v ON v.id = s.venue_id
            WHERE ($1::uuid IS NULL OR s.venue_id = $1)
              AND ($2::date IS NULL OR s.date = $2)
            ORDER BY s.date, s.start_time
            "#,
        )
        .bind(venue_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(SlotListing::from).collect())
    }
}
