use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request-path failures, each mapped to its own HTTP status instead of the
/// blanket 500 the service replaces.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing `video` field in multipart upload")]
    UploadMissing,

    #[error("invalid multipart request: {0}")]
    Multipart(#[from] MultipartError),

    #[error("could not open video file: {0}")]
    MediaOpen(String),

    #[error("image encoding failed: {0}")]
    Encoding(String),

    #[error("vision error: {0}")]
    Vision(#[from] opencv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker failure: {0}")]
    Worker(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UploadMissing | Error::Multipart(_) => StatusCode::BAD_REQUEST,
            Error::MediaOpen(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Encoding(_) | Error::Vision(_) | Error::Io(_) | Error::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Full detail stays server-side; the caller only sees the message.
        error!(status = %status, error = ?self, "request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_by_kind() {
        assert_eq!(Error::UploadMissing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::MediaOpen("tmp.mp4".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::Encoding("imencode returned false".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::Worker("pool drained".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upload_missing_names_the_field() {
        assert!(Error::UploadMissing.to_string().contains("video"));
    }
}
