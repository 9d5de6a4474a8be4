//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! prodplan-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `PLANNER_DATABASE_URL` - `PostgreSQL` connection string for the planner
//!
//! Migrations live in `crates/planner/migrations/`.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run planner database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the connection fails,
/// or a migration cannot be applied.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url: SecretString = std::env::var("PLANNER_DATABASE_URL")
        .map_err(|_| MigrationError::MissingEnvVar("PLANNER_DATABASE_URL"))?
        .into();

    tracing::info!("Connecting to planner database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running planner migrations...");
    sqlx::migrate!("../planner/migrations").run(&pool).await?;

    tracing::info!("Planner migrations complete!");
    Ok(())
}
