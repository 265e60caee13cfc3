use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Stored event record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRecord {
    /// Unique event ID
    pub id: Uuid,
    /// Event display name
    pub name: String,
    /// When the event was created; sole sort key for listings
    pub created_at: DateTime<Utc>,
}

/// Stored photo record, owned by one event
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PhotoRecord {
    /// Unique photo ID
    pub id: Uuid,
    /// Owning event ID
    pub event_id: Uuid,
    /// Public URL of the stored blob
    pub url: String,
    /// When the photo was uploaded; sort key within the event
    pub created_at: DateTime<Utc>,
}

/// Capability contract for the structured-record store: the `events`
/// collection plus each event's nested photo collection. Inserts generate
/// ids; scans are ordered by creation time, newest first.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GalleryStore: Send + Sync {
    /// Insert a new event with a generated id
    async fn insert_event(&self, name: &str, created_at: DateTime<Utc>) -> Result<EventRecord>;

    /// Insert a photo into an event's collection with a generated id.
    /// `event_id` is not validated against an existing event; the store
    /// trusts the caller.
    async fn insert_photo(
        &self,
        event_id: Uuid,
        url: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PhotoRecord>;

    /// All events, newest first
    async fn list_events(&self) -> Result<Vec<EventRecord>>;

    /// All photos of one event, newest first
    async fn list_photos(&self, event_id: Uuid) -> Result<Vec<PhotoRecord>>;
}

/// PostgreSQL-backed gallery store
pub struct PgGalleryStore {
    pool: PgPool,
}

impl PgGalleryStore {
    /// Create a new gallery store with connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .connect(&config.url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool (for health checks)
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl GalleryStore for PgGalleryStore {
    #[instrument(skip(self))]
    async fn insert_event(&self, name: &str, created_at: DateTime<Utc>) -> Result<EventRecord> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO events (id, name, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert event")?;

        debug!(event_id = %id, name = %name, "Event created");
        metrics::counter!("gallery.events.created").increment(1);

        Ok(EventRecord {
            id,
            name: name.to_string(),
            created_at,
        })
    }

    #[instrument(skip(self, url), fields(event_id = %event_id))]
    async fn insert_photo(
        &self,
        event_id: Uuid,
        url: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PhotoRecord> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO photos (id, event_id, url, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(event_id)
        .bind(url)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert photo record")?;

        debug!(photo_id = %id, "Photo record created");
        metrics::counter!("gallery.photos.indexed").increment(1);

        Ok(PhotoRecord {
            id,
            event_id,
            url: url.to_string(),
            created_at,
        })
    }

    async fn list_events(&self) -> Result<Vec<EventRecord>> {
        let events = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT id, name, created_at
            FROM events
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query events")?;

        Ok(events)
    }

    async fn list_photos(&self, event_id: Uuid) -> Result<Vec<PhotoRecord>> {
        let photos = sqlx::query_as::<_, PhotoRecord>(
            r#"
            SELECT id, event_id, url, created_at
            FROM photos
            WHERE event_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query photos")?;

        Ok(photos)
    }
}
