//! Umbra Gallery backend
//!
//! Minimal backend for event photo galleries: an administrator creates named
//! events and uploads batches of images into them; any client lists events
//! with their photo URLs. Blobs live in S3, records in PostgreSQL.
//!
//! ## Architecture
//!
//! ```text
//! HTTP (axum)                  S3 Bucket                PostgreSQL
//! ┌──────────────────┐        ┌────────────────┐       ┌──────────────┐
//! │ POST /admin/event│        │ events/        │       │ events       │
//! │ POST /admin/     │───────▶│   {event_id}/  │       │ photos       │
//! │      upload/:id  │        │   {ts}_{name}  │       └──────────────┘
//! │ GET  /events     │        └────────────────┘              ▲
//! └──────────────────┘                │                       │
//!          │                         ▼                        │
//!          ▼                  ┌────────────────┐              │
//! ┌──────────────────┐        │ public URL     │              │
//! │ GalleryService   │───────▶│ derived from   │──────────────┘
//! │ (upload pipeline)│        │ bucket + key   │
//! └──────────────────┘        └────────────────┘
//! ```
//!
//! Uploads run strictly sequentially per batch: for each file the blob is
//! written first, then its photo record. A mid-batch failure aborts the batch
//! and leaves earlier files persisted (no rollback); a blob whose record
//! insert failed stays behind as an orphan.

pub mod api;
pub mod config;
pub mod error;
pub mod gallery;
pub mod gallery_store;
pub mod object_store;

pub use api::AppState;
pub use config::Config;
pub use error::GalleryError;
pub use gallery::{BatchOutcome, EventFeedEntry, GalleryService, UploadFile};
pub use gallery_store::{EventRecord, GalleryStore, PgGalleryStore, PhotoRecord};
pub use object_store::{photo_key, ObjectStore, S3ObjectStore};
