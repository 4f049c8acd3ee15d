use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;
use slotbook_catalog::{Slot, VenueSummary};
use slotbook_order::{
    Booking, BookingRecord, BookingRepository, BookingRequest, BookingStatus, PaymentStatus, SettlementClaim,
    StoreError,
};
use slotbook_shared::Masked;
use crate::database::{db_err, is_unique_violation};
use crate::slot_repo::{SlotRow, SLOT_COLUMNS};

const BOOKING_COLUMNS: &str = "id, slot_id, customer_id, customer_name, customer_email, total_amount, \
    payment_status, status, payment_reference, settlement_started_at, created_at, updated_at";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    slot_id: Uuid,
    customer_id: Uuid,
    customer_name: Option<String>,
    customer_email: String,
    total_amount: i64,
    payment_status: String,
    status: String,
    payment_reference: Option<String>,
    settlement_started_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let corrupt = |e: slotbook_order::models::UnknownStatus| StoreError::Backend(e.to_string());
        Ok(Booking {
            id: row.id,
            slot_id: row.slot_id,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            customer_email: Masked::new(row.customer_email),
            total_amount: row.total_amount,
            payment_status: row.payment_status.parse::<PaymentStatus>().map_err(corrupt)?,
            status: row.status.parse::<BookingStatus>().map_err(corrupt)?,
            payment_reference: row.payment_reference,
            settlement_started_at: row.settlement_started_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    s_id: Uuid,
    s_venue_id: Uuid,
    s_date: chrono::NaiveDate,
    s_start_time: chrono::NaiveTime,
    s_end_time: chrono::NaiveTime,
    s_price: i64,
    s_is_available: bool,
    s_created_by: Uuid,
    s_created_at: DateTime<Utc>,
    venue_name: String,
    venue_location: String,
}

impl TryFrom<RecordRow> for BookingRecord {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let slot = Slot {
            id: row.s_id,
            venue_id: row.s_venue_id,
            date: row.s_date,
            start_time: row.s_start_time,
            end_time: row.s_end_time,
            price: row.s_price,
            is_available: row.s_is_available,
            created_by: row.s_created_by,
            created_at: row.s_created_at,
        };
        let venue = VenueSummary {
            id: slot.venue_id,
            name: row.venue_name,
            location: row.venue_location,
        };
        Ok(BookingRecord { booking: row.booking.try_into()?, slot, venue })
    }
}

impl PgBookingRepository {
    async fn lock_booking(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Booking, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err)?
        .ok_or_else(|| StoreError::NotFound(format!("booking {}", id)))?;

        row.try_into()
    }

    async fn write_status(tx: &mut Transaction<'_, Postgres>, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET payment_status = $2, status = $3, payment_reference = $4,
                settlement_started_at = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.payment_status.as_str())
        .bind(booking.status.as_str())
        .bind(&booking.payment_reference)
        .bind(booking.settlement_started_at)
        .bind(booking.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Load, apply `transition`, write back; all under the booking's row lock.
    async fn transition<F>(&self, id: Uuid, transition: F) -> Result<Booking, StoreError>
    where
        F: FnOnce(&mut Booking) -> Result<(), StoreError> + Send,
    {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut booking = Self::lock_booking(&mut tx, id).await?;
        transition(&mut booking)?;
        Self::write_status(&mut tx, &booking).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(booking)
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn book_slot(&self, request: &BookingRequest) -> Result<Booking, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // The claim: only one transaction can flip the flag
        let claimed = sqlx::query_as::<_, SlotRow>(&format!(
            "UPDATE slots SET is_available = false WHERE id = $1 AND is_available = true RETURNING {}",
            SLOT_COLUMNS
        ))
        .bind(request.slot_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let slot: Slot = match claimed {
            Some(row) => row.into(),
            None => {
                let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM slots WHERE id = $1")
                    .bind(request.slot_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_err)?;
                return Err(match exists {
                    Some(_) => StoreError::SlotUnavailable(request.slot_id),
                    None => StoreError::NotFound(format!("slot {}", request.slot_id)),
                });
            }
        };

        let booking = Booking::new(request, &slot);
        let inserted = sqlx::query(&format!(
            "INSERT INTO bookings ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            BOOKING_COLUMNS
        ))
        .bind(booking.id)
        .bind(booking.slot_id)
        .bind(booking.customer_id)
        .bind(&booking.customer_name)
        .bind(booking.customer_email.inner())
        .bind(booking.total_amount)
        .bind(booking.payment_status.as_str())
        .bind(booking.status.as_str())
        .bind(&booking.payment_reference)
        .bind(booking.settlement_started_at)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                // Flag was stale but an active booking exists
                warn!("Slot {} already has an active booking", slot.id);
                return Err(StoreError::SlotUnavailable(slot.id));
            }
            return Err(db_err(e));
        }

        tx.commit().await.map_err(db_err)?;
        info!("Booking {} claimed slot {}", booking.id, slot.id);
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(Booking::try_from).transpose()
    }

    async fn list_booking_records(
        &self,
        customer_id: Option<Uuid>,
        venue_id: Option<Uuid>,
    ) -> Result<Vec<BookingRecord>, StoreError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT b.id, b.slot_id, b.customer_id, b.customer_name, b.customer_email, b.total_amount,
                   b.payment_status, b.status, b.payment_reference, b.settlement_started_at,
                   b.created_at, b.updated_at,
                   s.id AS s_id, s.venue_id AS s_venue_id, s.date AS s_date,
                   s.start_time AS s_start_time, s.end_time AS s_end_time, s.price AS s_price,
                   s.is_available AS s_is_available, s.created_by AS s_created_by,
                   s.created_at AS s_created_at,
                   v.name AS venue_name, v.location AS venue_location
            FROM bookings b
            JOIN slots s ON s.id = b.slot_id
            JOIN venues v ON v.id = s.venue_id
            WHERE ($1::uuid IS NULL OR b.customer_id = $1)
              AND ($2::uuid IS NULL OR s.venue_id = $2)
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(customer_id)
        .bind(venue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(BookingRecord::try_from).collect()
    }

    async fn claim_settlement(&self, booking_id: Uuid, lease: Duration) -> Result<SettlementClaim, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut booking = Self::lock_booking(&mut tx, booking_id).await?;
        let claim = booking.claim_settlement(Utc::now(), lease)?;
        if claim == SettlementClaim::Claimed {
            Self::write_status(&mut tx, &booking).await?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(claim)
    }

    async fn release_settlement(&self, booking_id: Uuid) -> Result<(), StoreError> {
        self.transition(booking_id, |b| {
            b.release_settlement();
            Ok(())
        })
        .await
        .map(|_| ())
    }

    async fn record_payment(&self, booking_id: Uuid, reference: &str) -> Result<Booking, StoreError> {
        let reference = reference.to_string();
        self.transition(booking_id, move |b| b.mark_paid(&reference).map_err(StoreError::from)).await
    }

    async fn cancel_for_failed_payment(&self, booking_id: Uuid) -> Result<Booking, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut booking = Self::lock_booking(&mut tx, booking_id).await?;
        booking.mark_payment_failed()?;
        Self::write_status(&mut tx, &booking).await?;

        // Re-open the slot in the same transaction
        sqlx::query("UPDATE slots SET is_available = true WHERE id = $1")
            .bind(booking.slot_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        info!("Booking {} cancelled, slot {} released", booking.id, booking.slot_id);
        Ok(booking)
    }

    async fn complete_booking(&self, booking_id: Uuid) -> Result<Booking, StoreError> {
        self.transition(booking_id, |b| b.complete().map_err(StoreError::from)).await
    }
}
