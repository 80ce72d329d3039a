//! A user's favorites, split by expiry.

use std::sync::Arc;

use tracing::instrument;

use dealbook_core::{Clock, PromotionId, UserId, is_expired};

use super::ServiceError;
use crate::db::{FavoriteStore, PromotionStore};
use crate::models::{FavoritesSummary, PromotionView};

/// Partitions a user's favorites into active and expired buckets.
#[derive(Clone)]
pub struct SummaryService {
    promotions: Arc<dyn PromotionStore>,
    favorites: Arc<dyn FavoriteStore>,
    clock: Arc<dyn Clock>,
}

impl SummaryService {
    /// Create a new summary service.
    #[must_use]
    pub fn new(
        promotions: Arc<dyn PromotionStore>,
        favorites: Arc<dyn FavoriteStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            promotions,
            favorites,
            clock,
        }
    }

    /// Summarize the favorites of `user`.
    ///
    /// Both buckets are in listing order. A promotion expiring exactly now
    /// is expired; one that never expires is always active.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a store call fails.
    #[instrument(skip(self))]
    pub async fn summarize(&self, user: &UserId) -> Result<FavoritesSummary, ServiceError> {
        let favorites = self.favorites.find_by_user(user).await?;
        if favorites.is_empty() {
            return Ok(FavoritesSummary::default());
        }

        let ids: Vec<PromotionId> = favorites.into_iter().map(|f| f.promotion_id).collect();
        let promotions = self.promotions.find_by_ids(&ids).await?;

        let now = self.clock.now();
        let (expired, active): (Vec<PromotionView>, Vec<PromotionView>) = promotions
            .into_iter()
            .map(|p| p.into_view(true, now))
            .partition(|v| is_expired(v.promotion.expires_at, now));

        let summary = FavoritesSummary::from_buckets(active, expired);
        tracing::debug!(
            active = summary.stats.active,
            expired = summary.stats.expired,
            "favorites summarized"
        );
        Ok(summary)
    }
}
