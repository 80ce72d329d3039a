//! Promotion query and favorites services.
//!
//! # Services
//!
//! - [`CatalogService`] - filtered, paginated catalog pages and single lookups
//! - [`FavoritesService`] - idempotent favorite/unfavorite with audit trail
//! - [`SummaryService`] - a user's favorites split into active and expired
//!
//! Services are cheap to clone: they hold `Arc`s to their stores and the
//! clock, and keep no per-request state. Every operation takes the caller's
//! [`UserId`](dealbook_core::UserId) explicitly.

mod catalog;
mod error;
mod favorites;
mod summary;

#[cfg(test)]
pub(crate) mod fixtures;

pub use catalog::CatalogService;
pub use error::ServiceError;
pub use favorites::FavoritesService;
pub use summary::SummaryService;
