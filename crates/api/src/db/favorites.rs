//! Favorites and the favorites audit log.
//!
//! Toggling a favorite is a unit of work per `(user, promotion)` pair: the
//! existence check, the row change and the audit append all commit together
//! or not at all. See [`FavoriteUnit`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use dealbook_core::{AuditEventId, FavoriteAction, FavoriteId, PromotionId, UserId};

use super::{RepositoryError, is_unique_violation};
use crate::models::{AuditEvent, Favorite};

/// Outcome of inserting a favorite row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// The pair was already favorited, possibly by a concurrent writer.
    Duplicate,
}

/// Favorite lookups and unit-of-work factory.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Whether `user` has favorited `promotion`.
    async fn exists(&self, user: &UserId, promotion: &PromotionId)
    -> Result<bool, RepositoryError>;

    /// Every favorite of `user`.
    async fn find_by_user(&self, user: &UserId) -> Result<Vec<Favorite>, RepositoryError>;

    /// Favorites of `user` restricted to `ids`.
    async fn find_by_user_and_ids(
        &self,
        user: &UserId,
        ids: &[PromotionId],
    ) -> Result<Vec<Favorite>, RepositoryError>;

    /// Number of favorites `user` holds.
    async fn count_by_user(&self, user: &UserId) -> Result<u64, RepositoryError>;

    /// Open a unit of work for one `(user, promotion)` pair.
    ///
    /// Units for the same pair are serialized: a second `begin` waits until
    /// the first unit commits or is dropped.
    async fn begin(
        &self,
        user: &UserId,
        promotion: &PromotionId,
    ) -> Result<Box<dyn FavoriteUnit>, RepositoryError>;
}

/// Atomic check + change + audit for one `(user, promotion)` pair.
///
/// Nothing is visible to other callers until [`FavoriteUnit::commit`].
/// Dropping the unit without committing (including when the surrounding
/// future is cancelled) discards every change made through it.
#[async_trait]
pub trait FavoriteUnit: Send {
    /// Whether the pair is currently favorited, as seen by this unit.
    async fn exists(&mut self) -> Result<bool, RepositoryError>;

    /// Insert the favorite row.
    async fn insert(&mut self) -> Result<InsertOutcome, RepositoryError>;

    /// Delete the favorite row, returning the number of rows removed.
    async fn delete(&mut self) -> Result<u64, RepositoryError>;

    /// Append an audit event for the pair.
    async fn append_audit(&mut self, action: FavoriteAction) -> Result<(), RepositoryError>;

    /// Make every change in this unit visible.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Read side of the append-only audit log.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Events for one `(user, promotion)` pair, oldest first.
    async fn events_for(
        &self,
        user: &UserId,
        promotion: &PromotionId,
    ) -> Result<Vec<AuditEvent>, RepositoryError>;
}

/// Database row for `catalog.favorite`.
#[derive(Debug, sqlx::FromRow)]
struct FavoriteRow {
    id: Uuid,
    user_id: String,
    promotion_id: String,
    created_at: DateTime<Utc>,
}

impl From<FavoriteRow> for Favorite {
    fn from(row: FavoriteRow) -> Self {
        Self {
            id: FavoriteId::new(row.id),
            user_id: UserId::new(row.user_id),
            promotion_id: PromotionId::new(row.promotion_id),
            created_at: row.created_at,
        }
    }
}

/// Database row for `catalog.favorite_audit_event`.
#[derive(Debug, sqlx::FromRow)]
struct AuditEventRow {
    id: Uuid,
    user_id: String,
    promotion_id: String,
    action: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditEventRow> for AuditEvent {
    type Error = RepositoryError;

    fn try_from(row: AuditEventRow) -> Result<Self, Self::Error> {
        let action = row
            .action
            .parse::<FavoriteAction>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: AuditEventId::new(row.id),
            user_id: UserId::new(row.user_id),
            promotion_id: PromotionId::new(row.promotion_id),
            action,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL` favorites repository.
#[derive(Debug, Clone)]
pub struct PgFavoriteStore {
    pool: PgPool,
}

impl PgFavoriteStore {
    /// Create a new favorites repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavoriteStore for PgFavoriteStore {
    async fn exists(
        &self,
        user: &UserId,
        promotion: &PromotionId,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM catalog.favorite
                WHERE user_id = $1 AND promotion_id = $2
            )
            ",
        )
        .bind(user.as_str())
        .bind(promotion.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_by_user(&self, user: &UserId) -> Result<Vec<Favorite>, RepositoryError> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            r"
            SELECT id, user_id, promotion_id, created_at
            FROM catalog.favorite
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Favorite::from).collect())
    }

    async fn find_by_user_and_ids(
        &self,
        user: &UserId,
        ids: &[PromotionId],
    ) -> Result<Vec<Favorite>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = ids.iter().map(PromotionId::as_str).collect();
        let rows = sqlx::query_as::<_, FavoriteRow>(
            r"
            SELECT id, user_id, promotion_id, created_at
            FROM catalog.favorite
            WHERE user_id = $1 AND promotion_id = ANY($2)
            ",
        )
        .bind(user.as_str())
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Favorite::from).collect())
    }

    async fn count_by_user(&self, user: &UserId) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM catalog.favorite WHERE user_id = $1",
        )
        .bind(user.as_str())
        .fetch_one(&self.pool)
        .await?;

        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative row count: {count}")))
    }

    async fn begin(
        &self,
        user: &UserId,
        promotion: &PromotionId,
    ) -> Result<Box<dyn FavoriteUnit>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Held until commit or rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(pair_lock_key(user, promotion))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgFavoriteUnit {
            tx,
            user: user.clone(),
            promotion: promotion.clone(),
        }))
    }
}

#[async_trait]
impl AuditLog for PgFavoriteStore {
    async fn events_for(
        &self,
        user: &UserId,
        promotion: &PromotionId,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query_as::<_, AuditEventRow>(
            r"
            SELECT id, user_id, promotion_id, action, created_at
            FROM catalog.favorite_audit_event
            WHERE user_id = $1 AND promotion_id = $2
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(user.as_str())
        .bind(promotion.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditEvent::try_from).collect()
    }
}

/// Advisory lock key for a pair. Length-prefixed so distinct pairs never
/// share a key string.
fn pair_lock_key(user: &UserId, promotion: &PromotionId) -> String {
    format!("favorite:{}:{user}:{promotion}", user.as_str().len())
}

/// A favorites unit of work backed by a `PostgreSQL` transaction.
struct PgFavoriteUnit {
    tx: Transaction<'static, Postgres>,
    user: UserId,
    promotion: PromotionId,
}

#[async_trait]
impl FavoriteUnit for PgFavoriteUnit {
    async fn exists(&mut self) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM catalog.favorite
                WHERE user_id = $1 AND promotion_id = $2
            )
            ",
        )
        .bind(self.user.as_str())
        .bind(self.promotion.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn insert(&mut self) -> Result<InsertOutcome, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO catalog.favorite (id, user_id, promotion_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, promotion_id) DO NOTHING
            ",
        )
        .bind(FavoriteId::generate().as_uuid())
        .bind(self.user.as_str())
        .bind(self.promotion.as_str())
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(InsertOutcome::Duplicate),
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(RepositoryError::Database(e)),
        }
    }

    async fn delete(&mut self) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM catalog.favorite WHERE user_id = $1 AND promotion_id = $2")
                .bind(self.user.as_str())
                .bind(self.promotion.as_str())
                .execute(&mut *self.tx)
                .await?;

        Ok(result.rows_affected())
    }

    async fn append_audit(&mut self, action: FavoriteAction) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO catalog.favorite_audit_event (id, user_id, promotion_id, action)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(AuditEventId::generate().as_uuid())
        .bind(self.user.as_str())
        .bind(self.promotion.as_str())
        .bind(action.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_lock_key_is_unambiguous() {
        let a = pair_lock_key(&UserId::new("a:b"), &PromotionId::new("c"));
        let b = pair_lock_key(&UserId::new("a"), &PromotionId::new("b:c"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_audit_row_with_unknown_action_is_corrupt() {
        let row = AuditEventRow {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            promotion_id: "1".to_string(),
            action: "LIKED".to_string(),
            created_at: Utc::now(),
        };
        assert!(matches!(
            AuditEvent::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
