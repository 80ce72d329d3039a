//! Service error types.

use thiserror::Error;

use dealbook_core::PromotionId;

use crate::db::RepositoryError;

/// Errors returned by the promotion services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The referenced promotion does not exist.
    #[error("promotion {0} not found")]
    NotFound(PromotionId),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
