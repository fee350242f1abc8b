//! Image upload route.
//!
//! The browser shrinks and re-encodes the picture first, then posts it
//! here. The returned URL is attached to an entry by a later create or
//! edit; nothing is saved by this route.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::{AppState, error::ApiError};
use diary_core::entry::EntryError;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Creates the upload router with its body limit.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/images", post(upload_image))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Upload response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Public URL of the stored object.
    pub image_url: String,
}

struct UploadedFile {
    file_name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

/// Reads the first `file` field, skipping anything else.
async fn read_file(multipart: &mut Multipart) -> Result<Option<UploadedFile>, Response> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(IntoResponse::into_response)?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(IntoResponse::into_response)?;

        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

/// POST /images - Upload one image and return its public URL.
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, Response> {
    let file = read_file(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::from(EntryError::EmptyUpload).into_response())?;

    debug!(
        file_name = %file.file_name,
        size = file.bytes.len(),
        "Received image upload"
    );

    let image_url = state
        .diary()
        .upload_image(&file.file_name, file.content_type.as_deref(), file.bytes)
        .await
        .map_err(|err| ApiError::from(err).into_response())?;

    Ok(Json(UploadResponse { image_url }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use chrono::Duration;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::test_support::{bearer, fake_storage, state_with_storage, test_state};

    const BOUNDARY: &str = "diary-boundary";

    fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: image/webp\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(body: Vec<u8>) -> Request<Body> {
        Request::post("/images")
            .header("authorization", bearer("user-1", Duration::hours(1)))
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn call(state: AppState, request: Request<Body>) -> (StatusCode, String) {
        let response = crate::create_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let (storage, uploads) = fake_storage(StatusCode::OK, "{}").await;
        let state = state_with_storage(storage);

        let (status, body) = call(state, upload(multipart_body("file", "cat.webp", b"RIFF"))).await;

        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        let url = body["imageUrl"].as_str().unwrap();
        assert!(url.contains("/storage/v1/object/public/images/uploads/"));
        assert!(url.ends_with("_cat.webp"));
        assert_eq!(uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_bad_request() {
        let (storage, uploads) = fake_storage(StatusCode::OK, "{}").await;
        let state = state_with_storage(storage);

        let (status, body) =
            call(state, upload(multipart_body("other", "cat.webp", b"RIFF"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("No file uploaded."));
        assert!(uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_is_bad_request() {
        let (storage, uploads) = fake_storage(StatusCode::OK, "{}").await;
        let state = state_with_storage(storage);

        let (status, _) = call(state, upload(multipart_body("file", "cat.webp", b""))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_rejection_is_passed_through() {
        let (storage, _) = fake_storage(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large").await;
        let state = state_with_storage(storage);

        let (status, body) = call(state, upload(multipart_body("file", "cat.webp", b"RIFF"))).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, "Payload too large");
    }

    #[tokio::test]
    async fn test_unconfigured_storage_is_server_error() {
        let (status, _) = call(
            test_state(),
            upload(multipart_body("file", "cat.webp", b"RIFF")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_upload_requires_identity() {
        let request = Request::post("/images")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body("file", "cat.webp", b"RIFF")))
            .unwrap();

        let (status, _) = call(test_state(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
