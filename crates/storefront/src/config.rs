//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VITRINA_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `CHECKOUT_PHONE` - Contact number that receives checkout messages
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `CHECKOUT_GREETING` - First line of the checkout message
//! - `DISTRIBUTOR_URL` - Link to the distributor group shown in the header
//! - `STORAGE_BACKEND` - `local` (default) or `supabase`
//! - `STORAGE_LOCAL_DIR` - Directory for the local backend (default: media)
//! - `STORAGE_PUBLIC_URL` - Public URL of local objects (default: `{STOREFRONT_BASE_URL}/media`)
//! - `SUPABASE_URL`, `SUPABASE_SERVICE_KEY`, `SUPABASE_BUCKET` - Supabase backend
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;
use vitrina_core::checkout::DEFAULT_GREETING;
use vitrina_core::{StorageSettings, SupabaseStorageConfig};

/// Timeout for blob store reads made while serving downloads.
const STORAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Checkout handoff settings
    pub checkout: CheckoutConfig,
    /// Distributor group link for the header
    pub distributor_url: Option<String>,
    /// Where product images live
    pub storage: StorageSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Checkout handoff settings.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Store contact number
    pub phone: String,
    /// Greeting line at the top of the order message
    pub greeting: String,
}

impl StorefrontConfig {
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
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let checkout = CheckoutConfig::from_env()?;
        let distributor_url = get_optional_env("DISTRIBUTOR_URL");
        let storage = storage_from_env(&format!("{}/media", base_url.trim_end_matches('/')))?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            checkout,
            distributor_url,
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

impl CheckoutConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let phone = get_required_env("CHECKOUT_PHONE")?;
        if !phone.chars().any(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_PHONE".to_string(),
                "must contain digits".to_string(),
            ));
        }
        Ok(Self {
            phone,
            greeting: get_env_or_default("CHECKOUT_GREETING", DEFAULT_GREETING),
        })
    }
}

/// Read the blob store backend settings.
fn storage_from_env(default_public_base: &str) -> Result<StorageSettings, ConfigError> {
    match get_env_or_default("STORAGE_BACKEND", "local").as_str() {
        "local" => Ok(StorageSettings::Local {
            dir: PathBuf::from(get_env_or_default("STORAGE_LOCAL_DIR", "media")),
            public_base: get_env_or_default("STORAGE_PUBLIC_URL", default_public_base),
        }),
        "supabase" => {
            let base_url = Url::parse(&get_required_env("SUPABASE_URL")?).map_err(|e| {
                ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string())
            })?;
            Ok(StorageSettings::Supabase(SupabaseStorageConfig {
                base_url,
                service_key: SecretString::from(get_required_env("SUPABASE_SERVICE_KEY")?),
                bucket: get_env_or_default("SUPABASE_BUCKET", "products"),
                timeout: STORAGE_TIMEOUT,
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

/// Get a required environment variable.
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

/// Get an optional environment variable, treating empty as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            checkout: CheckoutConfig {
                phone: "15550100".to_string(),
                greeting: DEFAULT_GREETING.to_string(),
            },
            distributor_url: None,
            storage: StorageSettings::Local {
                dir: PathBuf::from("media"),
                public_base: "http://localhost:3000/media".to_string(),
            },
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_config_debug_redacts_database_url() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://user:hunter2@db/vitrina"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            checkout: CheckoutConfig {
                phone: "15550100".to_string(),
                greeting: DEFAULT_GREETING.to_string(),
            },
            distributor_url: None,
            storage: StorageSettings::Local {
                dir: PathBuf::from("media"),
                public_base: "http://localhost:3000/media".to_string(),
            },
            sentry_dsn: None,
        };

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
