use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use slotbook_catalog::{Venue, VenueFilter};
use slotbook_order::{StoreError, VenueRepository};
use crate::database::db_err;

pub struct PgVenueRepository {
    pool: PgPool,
}

impl PgVenueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct VenueRow {
    id: Uuid,
    name: String,
    location: String,
    description: Option<String>,
    facilities: Vec<String>,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<VenueRow> for Venue {
    fn from(row: VenueRow) -> Self {
        Venue {
            id: row.id,
            name: row.name,
            location: row.location,
            description: row.description,
            facilities: row.facilities,
            owner_id: row.owner_id,
            created_at: row.created_at,
        }
    }
}

/// `None` for blank needles, otherwise an ILIKE pattern
fn like_pattern(needle: Option<&str>) -> Option<String> {
    needle
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| format!("%{}%", n.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
}

#[async_trait]
impl VenueRepository for PgVenueRepository {
    async fn create_venue(&self, venue: &Venue) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO venues (id, name, location, description, facilities, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(venue.id)
        .bind(&venue.name)
        .bind(&venue.location)
        .bind(&venue.description)
        .bind(&venue.facilities)
        .bind(venue.owner_id)
        .bind(venue.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_venue(&self, id: Uuid) -> Result<Option<Venue>, StoreError> {
        let row = sqlx::query_as::<_, VenueRow>(
            "SELECT id, name, location, description, facilities, owner_id, created_at FROM venues WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Venue::from))
    }

    async fn list_venues(&self, filter: &VenueFilter) -> Result<Vec<Venue>, StoreError> {
        let rows = sqlx::query_as::<_, VenueRow>(
            r#"
            SELECT id, name, location, description, facilities, owner_id, created_at
            FROM venues
            WHERE ($1::text IS NULL OR name ILIKE $1)
              AND ($2::text IS NULL OR location ILIKE $2)
            ORDER BY name
            "#,
        )
        .bind(like_pattern(filter.name_contains.as_deref()))
        .bind(like_pattern(filter.location_contains.as_deref()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Venue::from).collect())
    }
}
