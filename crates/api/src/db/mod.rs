//! Storage for the promotion catalog.
//!
//! # Stores
//!
//! Services talk to storage only through the traits in this module:
//!
//! - [`PromotionStore`] - filtered/sorted/paginated catalog reads
//! - [`FavoriteStore`] - favorite lookups and per-pair units of work
//! - [`FavoriteUnit`] - check + insert/delete + audit append, committed together
//! - [`AuditLog`] - read side of the append-only audit trail
//!
//! # Implementations
//!
//! - [`PgPromotionStore`] / [`PgFavoriteStore`]: `PostgreSQL` (schema `catalog`)
//! - [`MemoryStore`]: in-memory, for tests and local demos
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p dealbook-cli -- migrate
//! ```

pub mod favorites;
pub mod memory;
pub mod promotions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use favorites::{AuditLog, FavoriteStore, FavoriteUnit, InsertOutcome, PgFavoriteStore};
pub use memory::MemoryStore;
pub use promotions::{PgPromotionStore, PromotionStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate promotion ID).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Whether a sqlx error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
