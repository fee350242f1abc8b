//! Application configuration management.

use serde::Deserialize;

use crate::connection::{ConnectionSettings, ConnectionStringError};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Session verification configuration.
    pub auth: AuthConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served under `/assets`.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    /// Largest accepted request body for image uploads.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            assets_dir: default_assets_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string, either `postgres://` URL or `Key=Value;` form.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Apply pending migrations when the server starts.
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

impl DatabaseConfig {
    /// Returns the configured connection string as a `postgres://` URL.
    pub fn connection_url(&self) -> Result<String, ConnectionStringError> {
        ConnectionSettings::parse(&self.url).map(|settings| settings.to_url())
    }
}

/// Object storage configuration as read from the environment.
///
/// Credentials are kept separately so the fallback chain can be resolved
/// once with [`StorageConfig::effective_key`].
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage project, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: Option<String>,
    /// Bucket holding uploaded images.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Service-role key (highest privilege).
    #[serde(default)]
    pub service_role_key: Option<String>,
    /// Service key.
    #[serde(default)]
    pub service_key: Option<String>,
    /// General API key.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            bucket: default_bucket(),
            service_role_key: None,
            service_key: None,
            api_key: None,
        }
    }
}

fn default_bucket() -> String {
    "images".to_string()
}

impl StorageConfig {
    /// Resolves the credential chain: service-role key, then service key,
    /// then the general API key. Blank values are skipped.
    #[must_use]
    pub fn effective_key(&self) -> Option<String> {
        [&self.service_role_key, &self.service_key, &self.api_key]
            .into_iter()
            .flatten()
            .map(|key| key.trim())
            .find(|key| !key.is_empty())
            .map(str::to_string)
    }

    /// Returns the base URL without a trailing slash, if one is set.
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        self.url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }
}

/// Session verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret shared with the identity provider for signing session tokens.
    pub secret: String,
    /// Name of the cookie carrying the session token.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_cookie_name() -> String {
    "diary_session".to_string()
}

/// Plain environment variables honoured on top of the `DIARY__` prefix.
const ENV_ALIASES: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("SUPABASE_URL", "storage.url"),
    ("SUPABASE_SERVICE_ROLE", "storage.service_role_key"),
    ("SUPABASE_SERVICE_KEY", "storage.service_key"),
    ("SUPABASE_KEY", "storage.api_key"),
    ("SESSION_SECRET", "auth.secret"),
    ("PORT", "server.port"),
];

impl AppConfig {
    /// Loads configuration from config files and the environment.
    ///
    /// Precedence, lowest first: `config/default`, `config/{RUN_MODE}`,
    /// `DIARY__SECTION__KEY` variables, then the well-known plain variables
    /// such as `DATABASE_URL` and `SUPABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("DIARY").separator("__"));

        for (var, key) in ENV_ALIASES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        builder.build()?.try_deserialize()
    }
}
