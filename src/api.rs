use crate::config::{AdminConfig, ApiConfig};
use crate::error::GalleryError;
use crate::gallery::{BatchOutcome, EventFeedEntry, GalleryService, UploadFile};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::instrument;
use uuid::Uuid;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gallery: Arc<GalleryService>,
    pub pool: PgPool,
    pub admin: AdminConfig,
}

/// Admin event creation request; the shared secret travels in the body
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

/// Event creation response
#[derive(Debug, Serialize)]
pub struct CreateEventResponse {
    pub id: Uuid,
    pub name: String,
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub uploaded: usize,
    pub urls: Vec<String>,
}

impl From<BatchOutcome> for UploadResponse {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            uploaded: outcome.uploaded,
            urls: outcome.urls,
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/admin/event", post(create_event))
        .route("/admin/upload/:event_id", post(upload_photos))
        .route("/events", get(list_events))
        // Upload batches are buffered in memory; axum's default 2MB body cap
        // would reject a single phone photo, so the limit is configured
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root banner
async fn root() -> &'static str {
    "Umbra Gallery backend online"
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "umbra-gallery"
    }))
}

/// Readiness check endpoint
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    // Check database connectivity
    match sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "database": "connected"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}

/// Create a new event (admin)
#[instrument(skip(state, request))]
async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> Result<Json<CreateEventResponse>, GalleryError> {
    if !state.admin.verify(&request.password) {
        return Err(GalleryError::Auth);
    }

    let event = state.gallery.create_event(&request.name).await?;

    Ok(Json(CreateEventResponse {
        id: event.id,
        name: event.name,
    }))
}

/// Upload a batch of images into an event (admin).
///
/// Multipart body: one `password` text field plus any number of `images`
/// file fields. The whole body is read into memory before the secret is
/// checked, so a wrong password still mutates nothing.
#[instrument(skip(state, multipart), fields(event_id = %event_id))]
async fn upload_photos(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, GalleryError> {
    let (password, files) = read_upload_form(multipart).await?;
    let response = authorize_upload(&state, event_id, &password, files).await?;
    Ok(Json(response))
}

/// Drain the multipart body into the password field and the file batch
async fn read_upload_form(
    mut multipart: Multipart,
) -> Result<(String, Vec<UploadFile>), GalleryError> {
    let mut password = String::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GalleryError::Multipart(e.into()))?
    {
        match field.name() {
            Some("password") => {
                password = field
                    .text()
                    .await
                    .map_err(|e| GalleryError::Multipart(e.into()))?;
            }
            Some("images") => {
                let original_filename = field.file_name().unwrap_or("file").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| GalleryError::Multipart(e.into()))?
                    .to_vec();

                files.push(UploadFile {
                    bytes,
                    content_type,
                    original_filename,
                });
            }
            // Unknown fields are ignored
            _ => {}
        }
    }

    Ok((password, files))
}

/// Verify the admin secret, then run the batch. The secret is checked before
/// anything touches the stores.
async fn authorize_upload(
    state: &AppState,
    event_id: Uuid,
    password: &str,
    files: Vec<UploadFile>,
) -> Result<UploadResponse, GalleryError> {
    if !state.admin.verify(password) {
        return Err(GalleryError::Auth);
    }

    let outcome = state.gallery.upload_photos(event_id, files).await?;
    Ok(outcome.into())
}

/// Public event feed: all events with their photo URLs, newest first
#[instrument(skip(state))]
async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventFeedEntry>>, GalleryError> {
    let feed = state.gallery.list_event_feed().await?;
    Ok(Json(feed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery_store::{MockGalleryStore, PhotoRecord};
    use crate::object_store::MockObjectStore;
    use sqlx::postgres::PgPoolOptions;

    fn test_state(objects: MockObjectStore, store: MockGalleryStore) -> AppState {
        // connect_lazy performs no I/O; handlers under test never touch the pool
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/gallery_test")
            .unwrap();

        AppState {
            gallery: Arc::new(GalleryService::new(Arc::new(objects), Arc::new(store))),
            pool,
            admin: AdminConfig {
                password: "hunter2".to_string(),
            },
        }
    }

    fn upload_file() -> UploadFile {
        UploadFile {
            bytes: vec![0xFF, 0xD8, 0xFF],
            content_type: "image/jpeg".to_string(),
            original_filename: "a.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_event_wrong_password_mutates_nothing() {
        // No mock expectations: any store call would panic the test
        let state = test_state(MockObjectStore::new(), MockGalleryStore::new());

        let err = create_event(
            State(state),
            Json(CreateEventRequest {
                password: "wrong".to_string(),
                name: "Wedding".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GalleryError::Auth));
    }

    #[tokio::test]
    async fn test_upload_wrong_password_mutates_nothing() {
        let state = test_state(MockObjectStore::new(), MockGalleryStore::new());

        let err = authorize_upload(&state, Uuid::new_v4(), "wrong", vec![upload_file()])
            .await
            .unwrap_err();

        assert!(matches!(err, GalleryError::Auth));
    }

    #[tokio::test]
    async fn test_upload_correct_password_runs_pipeline() {
        let mut objects = MockObjectStore::new();
        let mut store = MockGalleryStore::new();

        objects.expect_put_object().times(1).returning(|_, _, _| Ok(()));
        objects
            .expect_public_url()
            .returning(|key| format!("https://photos.test/{}", key));
        store
            .expect_insert_photo()
            .times(1)
            .returning(|event_id, url, created_at| {
                Ok(PhotoRecord {
                    id: Uuid::new_v4(),
                    event_id,
                    url: url.to_string(),
                    created_at,
                })
            });

        let state = test_state(objects, store);
        let response = authorize_upload(&state, Uuid::new_v4(), "hunter2", vec![upload_file()])
            .await
            .unwrap();

        assert_eq!(response.uploaded, 1);
        assert!(response.urls[0].ends_with("_a.jpg"));
    }

    #[tokio::test]
    async fn test_create_router_builds_with_configured_body_limit() {
        let state = test_state(MockObjectStore::new(), MockGalleryStore::new());
        let config = ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_enabled: true,
            cors_origins: vec![],
            max_upload_bytes: 32 * 1024 * 1024,
        };

        let _router = create_router(state, &config);
    }

    #[test]
    fn test_create_event_request_missing_fields_default_empty() {
        let request: CreateEventRequest = serde_json::from_str("{}").unwrap();
        assert!(request.password.is_empty());
        assert!(request.name.is_empty());
    }

    #[test]
    fn test_upload_response_from_outcome() {
        let outcome = BatchOutcome {
            uploaded: 2,
            urls: vec!["u1".to_string(), "u2".to_string()],
        };

        let response: UploadResponse = outcome.into();
        assert_eq!(response.uploaded, 2);
        assert_eq!(response.urls, vec!["u1", "u2"]);
    }

    #[test]
    fn test_upload_response_serializes_expected_shape() {
        let response = UploadResponse {
            uploaded: 1,
            urls: vec!["https://photos.test/u1".to_string()],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["uploaded"], 1);
        assert_eq!(json["urls"][0], "https://photos.test/u1");
    }
}
