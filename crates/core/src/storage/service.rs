//! Object storage client speaking the Supabase storage REST API.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use diary_shared::config::StorageConfig;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use super::error::StorageError;
use super::layout::BucketLayout;

/// Request timeout for every storage call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Uploads and removes objects in the image bucket.
///
/// Implemented by [`StorageClient`] for the real service and by in-memory
/// fakes in tests.
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` at `path` and returns the object's public URL.
    ///
    /// `path` is already percent-encoded. Existing objects are never
    /// overwritten.
    fn upload(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Removes the object a public URL points at.
    fn delete(&self, public_url: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Resolves a public URL to the object path inside the image bucket.
    ///
    /// Returns `None` for URLs this storage did not hand out.
    fn object_path(&self, public_url: &str) -> Option<String>;
}

/// HTTP client for the storage REST endpoint.
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    layout: Option<BucketLayout>,
    key: Option<String>,
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("layout", &self.layout)
            .field("key", &self.key.as_ref().map(|_| "[hidden]"))
            .finish_non_exhaustive()
    }
}

impl StorageClient {
    /// Creates a client from configuration.
    ///
    /// A missing base URL or credential is not an error here; calls made
    /// through such a client fail with [`StorageError::NotConfigured`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let layout = config
            .base_url()
            .map(|base| BucketLayout::new(base, config.bucket.clone()));
        Self::new(layout, config.effective_key())
    }

    /// Creates a client for an explicit layout and credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(layout: Option<BucketLayout>, key: Option<String>) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, layout, key })
    }

    /// Returns the bucket layout, if a base URL is configured.
    #[must_use]
    pub fn layout(&self) -> Option<&BucketLayout> {
        self.layout.as_ref()
    }

    /// Returns true when both a base URL and a credential are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.layout.is_some() && self.key.is_some()
    }

    fn credentials(&self) -> Result<(&BucketLayout, &str), StorageError> {
        let layout = self
            .layout
            .as_ref()
            .ok_or(StorageError::NotConfigured("base URL"))?;
        let key = self
            .key
            .as_deref()
            .ok_or(StorageError::NotConfigured("API key"))?;
        Ok((layout, key))
    }

    async fn rejected(response: reqwest::Response) -> StorageError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        StorageError::rejected(status, body)
    }
}

impl ObjectStorage for StorageClient {
    async fn upload(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let (layout, key) = self.credentials()?;
        let size = bytes.len();

        let response = self
            .http
            .post(layout.upload_url(path))
            .bearer_auth(key)
            .header("apikey", key)
            .header("x-upsert", "false")
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        info!(object_path = %path, size, "Image uploaded");
        Ok(layout.public_url(path))
    }

    async fn delete(&self, public_url: &str) -> Result<(), StorageError> {
        let (layout, key) = self.credentials()?;
        let path = layout
            .object_path(public_url)
            .ok_or_else(|| StorageError::invalid_url(public_url))?;

        let response = self
            .http
            .delete(layout.remove_url())
            .bearer_auth(key)
            .header("apikey", key)
            .json(&serde_json::json!({ "prefixes": [path.as_str()] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        debug!(object_path = %path, "Image removed from bucket");
        Ok(())
    }

    fn object_path(&self, public_url: &str) -> Option<String> {
        self.layout.as_ref()?.object_path(public_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        body::Bytes as BodyBytes,
        extract::State,
        http::{HeaderMap, StatusCode, Uri},
        routing::{delete, post},
    };

    #[derive(Debug, Clone)]
    struct Captured {
        uri: String,
        headers: HeaderMap,
        body: Vec<u8>,
    }

    type Log = Arc<Mutex<Vec<Captured>>>;

    async fn capture(State(log): State<Log>, uri: Uri, headers: HeaderMap, body: BodyBytes) -> &'static str {
        log.lock().unwrap().push(Captured {
            uri: uri.path().to_string(),
            headers,
            body: body.to_vec(),
        });
        "{}"
    }

    async fn reject() -> (StatusCode, &'static str) {
        (StatusCode::BAD_REQUEST, "The resource already exists")
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn recording_server() -> (String, Log) {
        let log = Log::default();
        let router = Router::new()
            .route("/storage/v1/object/images/{*path}", post(capture))
            .route("/storage/v1/object/images", delete(capture))
            .with_state(log.clone());
        (spawn(router).await, log)
    }

    fn client(base: &str, key: Option<&str>) -> StorageClient {
        StorageClient::new(
            Some(BucketLayout::new(base, "images")),
            key.map(String::from),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_upload_sends_credentials_and_returns_public_url() {
        let (base, log) = recording_server().await;
        let client = client(&base, Some("service-role"));

        let url = client
            .upload("uploads/abc_my%20cat.webp", Bytes::from_static(b"RIFF"), "image/webp")
            .await
            .unwrap();

        assert_eq!(
            url,
            format!("{base}/storage/v1/object/public/images/uploads/abc_my%20cat.webp")
        );

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        let request = &log[0];
        assert_eq!(request.uri, "/storage/v1/object/images/uploads/abc_my%20cat.webp");
        assert_eq!(request.headers["authorization"], "Bearer service-role");
        assert_eq!(request.headers["apikey"], "service-role");
        assert_eq!(request.headers["x-upsert"], "false");
        assert_eq!(request.headers["content-type"], "image/webp");
        assert_eq!(request.body, b"RIFF");
    }

    #[tokio::test]
    async fn test_upload_surfaces_rejection() {
        let router = Router::new().route("/storage/v1/object/images/{*path}", post(reject));
        let base = spawn(router).await;

        let err = client(&base, Some("key"))
            .upload("uploads/a.webp", Bytes::from_static(b"x"), "image/webp")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StorageError::rejected(400, "The resource already exists")
        );
    }

    #[tokio::test]
    async fn test_delete_posts_decoded_prefix() {
        let (base, log) = recording_server().await;
        let client = client(&base, Some("key"));
        let public_url = format!("{base}/storage/v1/object/public/images/uploads/abc_my%20cat.webp");

        client.delete(&public_url).await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].uri, "/storage/v1/object/images");
        let body: serde_json::Value = serde_json::from_slice(&log[0].body).unwrap();
        assert_eq!(body, serde_json::json!({ "prefixes": ["uploads/abc_my cat.webp"] }));
    }

    #[tokio::test]
    async fn test_delete_rejects_foreign_url() {
        let (base, log) = recording_server().await;

        let err = client(&base, Some("key"))
            .delete("https://cdn.example.com/cat.webp")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::InvalidUrl(_)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_configuration() {
        let no_key = client("http://127.0.0.1:9", None);
        let err = no_key
            .upload("uploads/a.webp", Bytes::from_static(b"x"), "image/webp")
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::NotConfigured("API key"));
        assert!(!no_key.is_configured());

        let no_base = StorageClient::new(None, Some("key".into())).unwrap();
        let err = no_base.delete("https://x/y").await.unwrap_err();
        assert_eq!(err, StorageError::NotConfigured("base URL"));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        // Nothing listens on the discard port.
        let err = client("http://127.0.0.1:9", Some("key"))
            .upload("uploads/a.webp", Bytes::from_static(b"x"), "image/webp")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Transport(_)));
    }

    #[test]
    fn test_from_config_resolves_key_chain() {
        let config = StorageConfig {
            url: Some("https://demo.supabase.co/".into()),
            bucket: "images".into(),
            service_role_key: None,
            service_key: Some(" ".into()),
            api_key: Some("anon".into()),
        };
        let client = StorageClient::from_config(&config).unwrap();
        assert!(client.is_configured());
        assert_eq!(
            client.layout().unwrap().public_url("uploads/a"),
            "https://demo.supabase.co/storage/v1/object/public/images/uploads/a"
        );
    }
}
