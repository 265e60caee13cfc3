use crate::config::S3Config;
use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Capability contract for the binary blob store: persist bytes under a key
/// and address them by a public URL. The pipeline only ever needs these two.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a blob under `key` with the declared content type.
    /// Awaited to completion before the caller proceeds.
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Publicly resolvable address of the blob at `key`, derived from
    /// configuration alone (no round trip to the store).
    fn public_url(&self, key: &str) -> String;
}

/// S3-backed object store for uploaded photos
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
}

impl S3ObjectStore {
    /// Create a new S3 object store
    pub async fn new(config: &S3Config) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let s3_config = s3_config_builder.build();
        let client = S3Client::from_conf(s3_config);

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 object store initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint_url: config.endpoint_url.clone(),
        })
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self, bytes), fields(key = %key, size_bytes = bytes.len()))]
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .context("Failed to upload photo to S3")?;

        debug!(key = %key, "Photo blob stored");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        match self.endpoint_url {
            // Path-style for custom endpoints (MinIO, LocalStack)
            Some(ref endpoint) => {
                format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
            }
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key),
        }
    }
}

/// Storage key for one uploaded photo.
/// Format: `events/{event_id}/{millis}_{filename}`
///
/// The millisecond timestamp plus the original filename is unique enough in
/// practice for sibling files of one event; two files with the same name
/// uploaded within the same millisecond collide and the later write wins at
/// the store level.
pub fn photo_key(event_id: Uuid, uploaded_at: DateTime<Utc>, original_filename: &str) -> String {
    format!(
        "events/{}/{}_{}",
        event_id,
        uploaded_at.timestamp_millis(),
        sanitize_filename(original_filename)
    )
}

/// Sanitize an uploaded filename for use as an S3 key component.
/// Keeps `.` so file extensions survive; everything else unsafe becomes `_`.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();

    // ".." segments must not survive into the key
    if cleaned.split('.').all(|s| s.is_empty()) {
        "file".to_string()
    } else {
        cleaned.replace("..", "_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_photo_key_format() {
        let event_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();

        let key = photo_key(event_id, at, "wedding.jpg");
        assert_eq!(
            key,
            format!(
                "events/550e8400-e29b-41d4-a716-446655440000/{}_wedding.jpg",
                at.timestamp_millis()
            )
        );
    }

    #[test]
    fn test_photo_key_sanitizes_filename() {
        let event_id = Uuid::nil();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();

        let key = photo_key(event_id, at, "my photo (1).jpg");
        assert!(key.ends_with("_my_photo__1_.jpg"));

        let key = photo_key(event_id, at, "../../etc/passwd");
        assert!(!key.contains(".."));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a-b_c.jpg"), "a-b_c.jpg");
        assert_eq!(sanitize_filename("hello world.png"), "hello_world.png");
        assert_eq!(sanitize_filename("ümlaut.gif"), "_mlaut.gif");
        assert_eq!(sanitize_filename("..."), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    fn test_config(endpoint_url: Option<String>) -> S3Config {
        S3Config {
            bucket: "umbra-photos".to_string(),
            region: "eu-west-1".to_string(),
            force_path_style: endpoint_url.is_some(),
            endpoint_url,
        }
    }

    #[tokio::test]
    async fn test_public_url_virtual_hosted_by_default() {
        // Client construction resolves no credentials and opens no connection
        let store = S3ObjectStore::new(&test_config(None)).await.unwrap();

        assert_eq!(
            store.public_url("events/e1/1705312245000_a.jpg"),
            "https://umbra-photos.s3.eu-west-1.amazonaws.com/events/e1/1705312245000_a.jpg"
        );
    }

    #[tokio::test]
    async fn test_public_url_path_style_with_custom_endpoint() {
        let store = S3ObjectStore::new(&test_config(Some("http://localhost:9000".to_string())))
            .await
            .unwrap();

        assert_eq!(
            store.public_url("events/e1/1_a.jpg"),
            "http://localhost:9000/umbra-photos/events/e1/1_a.jpg"
        );
    }

    #[tokio::test]
    async fn test_public_url_trims_trailing_endpoint_slash() {
        let store = S3ObjectStore::new(&test_config(Some("http://localhost:9000/".to_string())))
            .await
            .unwrap();

        assert_eq!(
            store.public_url("k"),
            "http://localhost:9000/umbra-photos/k"
        );
    }

    #[test]
    fn test_same_millisecond_same_name_collides() {
        // Documented limitation of the key policy
        let event_id = Uuid::nil();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(
            photo_key(event_id, at, "a.jpg"),
            photo_key(event_id, at, "a.jpg")
        );
    }
}
