use std::io::Write;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task;
use tracing::info;

use crate::error::Error;
use crate::pipeline;
use crate::server::AppState;

pub const VIDEO_FIELD: &str = "video";

#[derive(Debug, Serialize)]
pub struct HappyFramesResponse {
    pub happy_frames: Vec<String>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /extract_happy_frames`: multipart `video` field in, base64 JPEGs of
/// the smiling frames out.
pub async fn extract_happy_frames(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<HappyFramesResponse>, Error> {
    let mut video = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(VIDEO_FIELD) {
            video = Some(field.bytes().await?);
            break;
        }
    }
    let video = video.ok_or(Error::UploadMissing)?;
    info!(bytes = video.len(), "received video upload");

    let state = Arc::clone(&state);
    let happy_frames = task::spawn_blocking(move || {
        // NamedTempFile gives each request a unique path and removes the
        // file when it drops, success or failure.
        let mut tmp = tempfile::Builder::new()
            .prefix("happy-frames-")
            .suffix(".mp4")
            .tempfile()?;
        tmp.write_all(&video)?;
        tmp.flush()?;
        pipeline::process_video(tmp.path(), &state.detector, &state.options)
    })
    .await
    .map_err(|e| Error::Worker(format!("classification task panicked: {e}")))??;

    Ok(Json(HappyFramesResponse { happy_frames }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CascadePaths, DetectionParams};
    use crate::detector::SmileDetector;
    use crate::pipeline::PipelineOptions;
    use crate::server;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::path::PathBuf;
    use tower::ServiceExt;

    // Needs the OpenCV haarcascade data installed; callers skip quietly
    // when it is not.
    fn test_state() -> Option<Arc<AppState>> {
        let paths = CascadePaths::resolve(None, None).ok()?;
        let detector = SmileDetector::new(&paths, DetectionParams::default(), 2).ok()?;
        Some(Arc::new(AppState {
            detector,
            options: PipelineOptions {
                frame_stride: 10,
                dedup_similar: false,
            },
        }))
    }

    fn multipart_request(field: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "handler-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; \
                 name=\"{field}\"; filename=\"clip.mp4\"\r\n\
                 Content-Type: video/mp4\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/extract_happy_frames")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn leftover_upload_files() -> Vec<PathBuf> {
        std::fs::read_dir(std::env::temp_dir())
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| {
                        path.file_name()
                            .and_then(|name| name.to_str())
                            .is_some_and(|name| name.starts_with("happy-frames-"))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn missing_video_field_is_a_structured_400() {
        let Some(state) = test_state() else {
            return;
        };
        let router = server::build_router(state, 1024 * 1024);

        let response = router
            .oneshot(multipart_request("clip", b"whatever"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("application/json"));
    }

    #[tokio::test]
    async fn failed_request_leaves_no_upload_file_behind() {
        let Some(state) = test_state() else {
            return;
        };
        let router = server::build_router(state, 1024 * 1024);

        let response = router
            .oneshot(multipart_request(VIDEO_FIELD, b"this is not a video"))
            .await
            .unwrap();

        // Garbage bytes never produce happy frames; depending on the
        // decode backend the request fails to open (422) or decodes to
        // nothing (200 with an empty set). Either way the stored upload
        // must be gone.
        assert!(
            response.status() == StatusCode::UNPROCESSABLE_ENTITY
                || response.status() == StatusCode::INTERNAL_SERVER_ERROR
                || response.status() == StatusCode::OK
        );
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("application/json"));
        assert!(leftover_upload_files().is_empty());
    }

    #[test]
    fn response_serializes_under_fixed_key() {
        let body = serde_json::to_value(HappyFramesResponse {
            happy_frames: vec!["aGVsbG8=".into()],
        })
        .unwrap();
        assert_eq!(body, json!({ "happy_frames": ["aGVsbG8="] }));
    }

    #[test]
    fn empty_set_serializes_to_empty_array() {
        let body = serde_json::to_value(HappyFramesResponse {
            happy_frames: Vec::new(),
        })
        .unwrap();
        assert_eq!(body, json!({ "happy_frames": [] }));
    }
}
