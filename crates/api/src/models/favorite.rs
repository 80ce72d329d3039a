//! Favorite and audit trail types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dealbook_core::{AuditEventId, FavoriteAction, FavoriteId, PromotionId, UserId};

use super::PromotionView;

/// A user's favorite promotion. Unique per `(user_id, promotion_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    /// Row ID.
    pub id: FavoriteId,
    /// User who favorited the promotion.
    pub user_id: UserId,
    /// Favorited promotion.
    pub promotion_id: PromotionId,
    /// When the favorite was created.
    pub created_at: DateTime<Utc>,
}

/// One entry in the append-only favorites audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Event ID.
    pub id: AuditEventId,
    /// Acting user.
    pub user_id: UserId,
    /// Promotion acted on.
    pub promotion_id: PromotionId,
    /// What happened.
    pub action: FavoriteAction,
    /// When it happened.
    pub created_at: DateTime<Utc>,
}

/// Result of a favorite/unfavorite call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStatus {
    /// Promotion the call targeted.
    pub promotion_id: PromotionId,
    /// Favorite state after the call.
    pub is_favorite: bool,
}

/// A user's favorites split by expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FavoritesSummary {
    /// Favorites that have not expired, in listing order.
    pub active: Vec<PromotionView>,
    /// Favorites whose expiry is at or before now, in listing order.
    pub expired: Vec<PromotionView>,
    /// Bucket counts.
    pub stats: FavoriteStats,
}

/// Counts for a [`FavoritesSummary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FavoriteStats {
    /// `active + expired`.
    pub total: usize,
    /// Number of active favorites.
    pub active: usize,
    /// Number of expired favorites.
    pub expired: usize,
}

impl FavoritesSummary {
    /// Build a summary from already-partitioned buckets.
    #[must_use]
    pub fn from_buckets(active: Vec<PromotionView>, expired: Vec<PromotionView>) -> Self {
        let stats = FavoriteStats {
            total: active.len() + expired.len(),
            active: active.len(),
            expired: expired.len(),
        };
        Self {
            active,
            expired,
            stats,
        }
    }
}
