//! Favorite / unfavorite.
//!
//! Both operations are idempotent. An audit event is appended exactly when
//! a favorite row is actually created or removed, in the same unit of work
//! as the row change. Losing an insert race to a concurrent writer is folded
//! into the "already favorited" outcome.

use std::sync::Arc;

use tracing::instrument;

use dealbook_core::{FavoriteAction, PromotionId, UserId};

use super::ServiceError;
use crate::db::{FavoriteStore, InsertOutcome, PromotionStore};
use crate::models::FavoriteStatus;

/// Toggles favorite state and records the audit trail.
#[derive(Clone)]
pub struct FavoritesService {
    promotions: Arc<dyn PromotionStore>,
    favorites: Arc<dyn FavoriteStore>,
}

impl FavoritesService {
    /// Create a new favorites service.
    #[must_use]
    pub fn new(promotions: Arc<dyn PromotionStore>, favorites: Arc<dyn FavoriteStore>) -> Self {
        Self {
            promotions,
            favorites,
        }
    }

    /// Mark `promotion` as a favorite of `user`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the promotion does not exist.
    /// Returns `ServiceError::Repository` if a store call fails; nothing is
    /// changed in that case.
    #[instrument(skip(self))]
    pub async fn favorite(
        &self,
        user: &UserId,
        promotion: &PromotionId,
    ) -> Result<FavoriteStatus, ServiceError> {
        self.ensure_exists(promotion).await?;

        let mut unit = self.favorites.begin(user, promotion).await?;

        if unit.exists().await? {
            tracing::debug!("already favorited");
            return Ok(status(promotion, true));
        }

        if unit.insert().await? == InsertOutcome::Duplicate {
            tracing::warn!("concurrent favorite won the race");
            return Ok(status(promotion, true));
        }

        unit.append_audit(FavoriteAction::Favorited).await?;
        unit.commit().await?;

        tracing::info!("promotion favorited");
        Ok(status(promotion, true))
    }

    /// Remove `promotion` from the favorites of `user`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the promotion does not exist.
    /// Returns `ServiceError::Repository` if a store call fails; nothing is
    /// changed in that case.
    #[instrument(skip(self))]
    pub async fn unfavorite(
        &self,
        user: &UserId,
        promotion: &PromotionId,
    ) -> Result<FavoriteStatus, ServiceError> {
        self.ensure_exists(promotion).await?;

        let mut unit = self.favorites.begin(user, promotion).await?;

        if unit.delete().await? == 0 {
            tracing::debug!("not favorited");
            return Ok(status(promotion, false));
        }

        unit.append_audit(FavoriteAction::Unfavorited).await?;
        unit.commit().await?;

        tracing::info!("promotion unfavorited");
        Ok(status(promotion, false))
    }

    async fn ensure_exists(&self, promotion: &PromotionId) -> Result<(), ServiceError> {
        match self.promotions.find_by_id(promotion).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(promotion.clone())),
        }
    }
}

fn status(promotion: &PromotionId, is_favorite: bool) -> FavoriteStatus {
    FavoriteStatus {
        promotion_id: promotion.clone(),
        is_favorite,
    }
}
