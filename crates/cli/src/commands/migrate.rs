//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! vitrina-cli migrate
//! ```
//!
//! Runs the catalog migrations in `crates/core/migrations/`, then creates
//! the storefront and admin session tables.
//!
//! # Environment Variables
//!
//! - `VITRINA_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::SecretString;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;
use vitrina_admin::middleware::create_session_store;
use vitrina_core::catalog::postgres::create_pool;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Neither database URL variable is set.
    #[error("Missing environment variable: VITRINA_DATABASE_URL or DATABASE_URL")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A catalog migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The admin session table name was rejected.
    #[error("Invalid session table: {0}")]
    SessionTable(String),
}

/// Read the database URL the way the services do.
pub fn database_url() -> Result<SecretString, MigrationError> {
    std::env::var("VITRINA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingDatabaseUrl)
}

/// Run all migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url()?).await?;

    tracing::info!("Running catalog migrations...");
    sqlx::migrate!("../core/migrations").run(&pool).await?;

    tracing::info!("Creating storefront session table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Creating admin session table...");
    create_session_store(&pool)
        .map_err(MigrationError::SessionTable)?
        .migrate()
        .await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
