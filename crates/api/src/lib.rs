//! HTTP layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Diary entry routes and the image upload endpoint
//! - The identity middleware and `CurrentUser` extractor
//! - Error-to-response mapping and flash messages
//! - Static serving of the client upload helper

pub mod error;
pub mod flash;
pub mod middleware;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use diary_core::entry::DiaryService;
use diary_core::storage::StorageClient;
use diary_db::SeaEntryRepository;
use diary_shared::SessionVerifier;

/// Diary service wired to the real store and storage client.
pub type Diary = DiaryService<SeaEntryRepository, StorageClient>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Object storage client for diary images.
    pub storage: Arc<StorageClient>,
    /// Verifies session tokens issued by the identity service.
    pub sessions: Arc<SessionVerifier>,
    /// Name of the cookie carrying the session token.
    pub session_cookie: Arc<str>,
    /// Directory served under `/assets`.
    pub assets_dir: PathBuf,
    /// Largest accepted upload body in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Builds the diary service for one request.
    #[must_use]
    pub fn diary(&self) -> Diary {
        let repo = SeaEntryRepository::new(Arc::clone(&self.db));
        DiaryService::new(Arc::new(repo), Arc::clone(&self.storage))
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::app_routes(state.clone()))
        .nest_service("/assets", ServeDir::new(&state.assets_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support;
