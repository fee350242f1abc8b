//! Diary server
//!
//! Main entry point for the diary web application.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use diary_api::{AppState, create_router};
use diary_core::storage::StorageClient;
use diary_db::{connect, migration::Migrator};
use diary_shared::{AppConfig, SessionVerifier};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "diary=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    if config.database.run_migrations {
        Migrator::up(&db, None)
            .await
            .context("Failed to apply migrations")?;
        info!("Migrations applied");
    }

    // Image storage is optional until someone uploads
    let storage = StorageClient::from_config(&config.storage)?;
    if storage.is_configured() {
        info!(bucket = %config.storage.bucket, "Image storage configured");
    } else {
        warn!("Image storage is not configured; uploads and image removal will fail");
    }

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        storage: Arc::new(storage),
        sessions: Arc::new(SessionVerifier::new(&config.auth.secret)),
        session_cookie: Arc::from(config.auth.cookie_name.as_str()),
        assets_dir: PathBuf::from(&config.server.assets_dir),
        max_upload_bytes: config.server.max_upload_bytes,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
