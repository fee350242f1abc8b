//! Shared fixtures for route tests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, Uri},
    routing::post,
};
use chrono::Duration;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

use crate::AppState;
use diary_core::storage::{BucketLayout, StorageClient};
use diary_shared::{SessionVerifier, UserId};

pub(crate) const SECRET: &str = "test-session-secret";

/// State with an empty mock database and no storage configured.
pub(crate) fn test_state() -> AppState {
    state_with_db(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

pub(crate) fn state_with_db(db: DatabaseConnection) -> AppState {
    build(db, StorageClient::new(None, None).unwrap())
}

pub(crate) fn state_with_storage(storage: StorageClient) -> AppState {
    build(
        MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        storage,
    )
}

fn build(db: DatabaseConnection, storage: StorageClient) -> AppState {
    AppState {
        db: Arc::new(db),
        storage: Arc::new(storage),
        sessions: Arc::new(SessionVerifier::new(SECRET)),
        session_cookie: Arc::from("diary_session"),
        assets_dir: PathBuf::from("assets"),
        max_upload_bytes: 1024 * 1024,
    }
}

pub(crate) fn token_for(user: &str, ttl: Duration) -> String {
    SessionVerifier::new(SECRET)
        .issue(&UserId::new(user), ttl)
        .unwrap()
}

pub(crate) fn bearer(user: &str, ttl: Duration) -> String {
    format!("Bearer {}", token_for(user, ttl))
}

pub(crate) type Uploads = Arc<Mutex<Vec<String>>>;

/// Starts a storage endpoint that answers every upload with `status` and
/// `body`, recording the object paths it saw.
pub(crate) async fn fake_storage(
    status: StatusCode,
    body: &'static str,
) -> (StorageClient, Uploads) {
    let uploads = Uploads::default();
    let router = Router::new()
        .route(
            "/storage/v1/object/images/{*path}",
            post(
                move |State(uploads): State<Uploads>, uri: Uri, _body: Bytes| async move {
                    uploads.lock().unwrap().push(uri.path().to_string());
                    (status, body)
                },
            ),
        )
        .with_state(uploads.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = StorageClient::new(
        Some(BucketLayout::new(base, "images")),
        Some("service-role".to_string()),
    )
    .unwrap();
    (client, uploads)
}
