use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the gallery operations.
///
/// Every externally-visible operation converts its failure into one of these
/// at the boundary; the HTTP layer maps each variant to a status code plus a
/// short human-readable message. Nothing is retried.
#[derive(Debug, Error)]
pub enum GalleryError {
    /// Missing or invalid required input
    #[error("{0}")]
    Validation(String),

    /// Admin secret mismatch
    #[error("invalid password")]
    Auth,

    /// Upload batch aborted; `completed` files were fully persisted
    /// (blob + photo record) before the failing one
    #[error("upload failed after {completed} file(s)")]
    Upload {
        completed: usize,
        #[source]
        source: anyhow::Error,
    },

    /// Document store read failure
    #[error("failed to read events")]
    Read(#[source] anyhow::Error),

    /// Document store write failure
    #[error("failed to write record")]
    Write(#[source] anyhow::Error),

    /// Malformed multipart request body
    #[error("invalid multipart body")]
    Multipart(#[source] anyhow::Error),
}

/// Error response body: a message only, no structured codes
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl GalleryError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            GalleryError::Validation(_) | GalleryError::Multipart(_) => StatusCode::BAD_REQUEST,
            GalleryError::Auth => StatusCode::FORBIDDEN,
            GalleryError::Upload { .. } | GalleryError::Read(_) | GalleryError::Write(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, source = ?self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GalleryError::Validation("name required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(GalleryError::Auth.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GalleryError::Upload {
                completed: 1,
                source: anyhow::anyhow!("boom"),
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GalleryError::Read(anyhow::anyhow!("down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_passthrough() {
        let err = GalleryError::Validation("no images provided".into());
        assert_eq!(err.to_string(), "no images provided");
    }

    #[test]
    fn test_upload_message_reports_completed_count() {
        let err = GalleryError::Upload {
            completed: 3,
            source: anyhow::anyhow!("s3 unreachable"),
        };
        assert_eq!(err.to_string(), "upload failed after 3 file(s)");
    }
}
