//! Domain models for the promotion catalog.
//!
//! These types are what services exchange with stores and what routes return
//! to clients. Row types used by the Postgres store live next to their queries
//! in [`crate::db`].

pub mod favorite;
pub mod promotion;

pub use favorite::{AuditEvent, Favorite, FavoriteStats, FavoriteStatus, FavoritesSummary};
pub use promotion::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageMeta, PageRequest, PageRequestError, Promotion,
    PromotionFilter, PromotionView, PromotionsPage, listing_order,
};
