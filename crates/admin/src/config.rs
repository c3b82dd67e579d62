//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VITRINA_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_BASE_URL` - Public URL for the admin panel
//! - `ADMIN_EMAIL` - Operator login email
//! - `ADMIN_PASSWORD_HASH` - Argon2 PHC string (`vitrina-cli admin hash-password`)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_WATERMARK_PATH` - Overlay logo (default: crates/admin/static/watermark.png)
//! - `ADMIN_REMOTE_TIMEOUT_SECS` - Bound on each store call during uploads (default: 30)
//! - `ADMIN_MAX_UPLOAD_MB` - Request body limit for product uploads (default: 25)
//! - `STORAGE_BACKEND` - `local` (default) or `supabase`
//! - `STORAGE_LOCAL_DIR` - Directory for the local backend (default: media)
//! - `STORAGE_PUBLIC_URL` - Public URL of local objects (default: <http://localhost:3000/media>)
//! - `SUPABASE_URL`, `SUPABASE_SERVICE_KEY`, `SUPABASE_BUCKET` - Supabase backend
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use argon2::password_hash::PasswordHash;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;
use vitrina_core::{Email, StorageSettings, SupabaseStorageConfig};

const DEFAULT_WATERMARK_PATH: &str = "crates/admin/static/watermark.png";

/// Local media is served by the storefront, so that is where URLs point.
const DEFAULT_PUBLIC_MEDIA_URL: &str = "http://localhost:3000/media";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin panel
    pub base_url: String,
    /// Operator credentials
    pub auth: AuthConfig,
    /// Overlay logo composited onto product images
    pub watermark_path: PathBuf,
    /// Upper bound for each remote call in the upload flow
    pub remote_timeout: Duration,
    /// Maximum request body size for product uploads, in bytes
    pub max_upload_bytes: usize,
    /// Where product images are written
    pub storage: StorageSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Operator login settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub email: Email,
    /// Argon2 PHC string
    pub password_hash: SecretString,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("VITRINA_DATABASE_URL")?;
        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = parse_env("ADMIN_PORT", "3001")?;
        let base_url = get_required_env("ADMIN_BASE_URL")?;
        let auth = AuthConfig::from_env()?;
        let watermark_path =
            PathBuf::from(get_env_or_default("ADMIN_WATERMARK_PATH", DEFAULT_WATERMARK_PATH));
        let remote_timeout = Duration::from_secs(parse_env("ADMIN_REMOTE_TIMEOUT_SECS", "30")?);
        let max_upload_mb: usize = parse_env("ADMIN_MAX_UPLOAD_MB", "25")?;
        let storage = storage_from_env(remote_timeout)?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            auth,
            watermark_path,
            remote_timeout,
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            storage,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let email = Email::parse(&get_required_env("ADMIN_EMAIL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_EMAIL".to_string(), e.to_string()))?;
        let password_hash = SecretString::from(get_required_env("ADMIN_PASSWORD_HASH")?);

        // Reject a malformed hash now rather than on the first login attempt
        PasswordHash::new(password_hash.expose_secret()).map_err(|e| {
            ConfigError::InvalidEnvVar("ADMIN_PASSWORD_HASH".to_string(), e.to_string())
        })?;

        Ok(Self {
            email,
            password_hash,
        })
    }
}

/// Read the blob store backend settings.
fn storage_from_env(timeout: Duration) -> Result<StorageSettings, ConfigError> {
    match get_env_or_default("STORAGE_BACKEND", "local").as_str() {
        "local" => Ok(StorageSettings::Local {
            dir: PathBuf::from(get_env_or_default("STORAGE_LOCAL_DIR", "media")),
            public_base: get_env_or_default("STORAGE_PUBLIC_URL", DEFAULT_PUBLIC_MEDIA_URL),
        }),
        "supabase" => {
            let base_url = Url::parse(&get_required_env("SUPABASE_URL")?).map_err(|e| {
                ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string())
            })?;
            Ok(StorageSettings::Supabase(SupabaseStorageConfig {
                base_url,
                service_key: SecretString::from(get_required_env("SUPABASE_SERVICE_KEY")?),
                bucket: get_env_or_default("SUPABASE_BUCKET", "products"),
                timeout,
            }))
        }
        other => Err(ConfigError::InvalidEnvVar(
            "STORAGE_BACKEND".to_string(),
            format!("unknown backend '{other}' (expected local or supabase)"),
        )),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
