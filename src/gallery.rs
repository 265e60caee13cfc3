use crate::error::GalleryError;
use crate::gallery_store::{EventRecord, GalleryStore};
use crate::object_store::{photo_key, ObjectStore};
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// One in-memory file of an upload batch
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Raw uploaded bytes
    pub bytes: Vec<u8>,
    /// Content type declared by the uploader; not validated server-side
    pub content_type: String,
    /// Original filename as sent by the uploader
    pub original_filename: String,
}

/// Result of a fully successful upload batch
#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    /// Number of photos uploaded
    pub uploaded: usize,
    /// Public URLs in input-file order
    pub urls: Vec<String>,
}

/// Denormalized listing entry: one event plus its photo URLs, newest first
#[derive(Debug, Serialize)]
pub struct EventFeedEntry {
    pub id: Uuid,
    pub name: String,
    pub photos: Vec<String>,
}

/// Gallery operations: event creation, the photo upload pipeline, and the
/// public event feed. Holds the two storage capabilities and nothing else;
/// all configuration is resolved before construction.
pub struct GalleryService {
    objects: Arc<dyn ObjectStore>,
    store: Arc<dyn GalleryStore>,
}

impl GalleryService {
    pub fn new(objects: Arc<dyn ObjectStore>, store: Arc<dyn GalleryStore>) -> Self {
        Self { objects, store }
    }

    /// Create a new named event.
    #[instrument(skip(self))]
    pub async fn create_event(&self, name: &str) -> Result<EventRecord, GalleryError> {
        if name.is_empty() {
            return Err(GalleryError::Validation("name required".to_string()));
        }

        let event = self
            .store
            .insert_event(name, Utc::now())
            .await
            .map_err(GalleryError::Write)?;

        info!(event_id = %event.id, name = %event.name, "Event created");
        Ok(event)
    }

    /// Upload a batch of photos into an event, strictly sequentially.
    ///
    /// Per file: take the wall clock, derive the storage key, write the blob
    /// (awaited), derive the public URL, insert the photo record. The first
    /// failure aborts the batch with [`GalleryError::Upload`] carrying the
    /// count of files fully persisted before it. Already-persisted files are
    /// not rolled back; a blob whose record insert failed stays behind as an
    /// orphan.
    ///
    /// `event_id` is trusted as-is; it is not checked against an existing
    /// event before the batch starts.
    #[instrument(skip(self, files), fields(event_id = %event_id, batch_size = files.len()))]
    pub async fn upload_photos(
        &self,
        event_id: Uuid,
        files: Vec<UploadFile>,
    ) -> Result<BatchOutcome, GalleryError> {
        if files.is_empty() {
            return Err(GalleryError::Validation("no images provided".to_string()));
        }

        let mut urls = Vec::with_capacity(files.len());

        for file in files {
            match self.upload_one(event_id, file).await {
                Ok(url) => urls.push(url),
                Err(source) => {
                    return Err(GalleryError::Upload {
                        completed: urls.len(),
                        source,
                    });
                }
            }
        }

        metrics::counter!("gallery.photos.uploaded").increment(urls.len() as u64);
        info!(uploaded = urls.len(), "Upload batch completed");

        Ok(BatchOutcome {
            uploaded: urls.len(),
            urls,
        })
    }

    /// One discrete upload step: blob first, then the photo record.
    /// Returns the public URL on full success.
    async fn upload_one(&self, event_id: Uuid, file: UploadFile) -> Result<String> {
        let now = Utc::now();
        let key = photo_key(event_id, now, &file.original_filename);

        self.objects
            .put_object(&key, file.bytes, &file.content_type)
            .await?;

        let url = self.objects.public_url(&key);
        self.store.insert_photo(event_id, &url, now).await?;

        Ok(url)
    }

    /// All events with their photo URLs, newest first on both levels.
    ///
    /// One read for the events plus one per event for its photos; any nested
    /// failure fails the whole listing.
    #[instrument(skip(self))]
    pub async fn list_event_feed(&self) -> Result<Vec<EventFeedEntry>, GalleryError> {
        let events = self.store.list_events().await.map_err(GalleryError::Read)?;

        let mut feed = Vec::with_capacity(events.len());

        for event in events {
            let photos = self
                .store
                .list_photos(event.id)
                .await
                .map_err(GalleryError::Read)?;

            feed.push(EventFeedEntry {
                id: event.id,
                name: event.name,
                photos: photos.into_iter().map(|p| p.url).collect(),
            });
        }

        Ok(feed)
    }
}
