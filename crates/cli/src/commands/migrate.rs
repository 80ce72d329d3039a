//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! dealbook-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DEALBOOK_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/api/migrations/` and are embedded at compile time:
//! ```text
//! migrations/
//! ├── 20251120000001_create_promotions.sql
//! ├── 20251120000002_create_favorites.sql
//! └── 20251120000003_create_favorite_audit_events.sql
//! ```

use thiserror::Error;
use tracing::info;

use dealbook_api::db;

use super::database_url;

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

/// Run the API database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database URL is missing, the connection
/// fails, or a migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url().map_err(|_| MigrationError::MissingEnvVar("DEALBOOK_DATABASE_URL"))?;

    info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    info!("Migrations complete!");
    Ok(())
}
