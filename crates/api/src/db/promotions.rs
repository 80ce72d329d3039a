//! Promotion catalog repository.
//!
//! Queries are built at runtime with `sqlx::QueryBuilder` because the set of
//! active filters varies per request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use dealbook_core::{PromotionId, RewardCurrency};

use super::{RepositoryError, is_unique_violation};
use crate::models::{Promotion, PromotionFilter};

/// Read access to the promotion catalog.
///
/// Every multi-row read returns promotions in listing order: `expires_at`
/// ascending with `NULL` last, then `created_at` descending, then `id`
/// ascending (see [`crate::models::listing_order`]).
#[async_trait]
pub trait PromotionStore: Send + Sync {
    /// One page of promotions matching `filter`, plus the total match count.
    async fn find_page(
        &self,
        filter: &PromotionFilter,
        skip: u64,
        take: u32,
    ) -> Result<(Vec<Promotion>, u64), RepositoryError>;

    /// A single promotion by ID.
    async fn find_by_id(&self, id: &PromotionId) -> Result<Option<Promotion>, RepositoryError>;

    /// Every promotion whose ID is in `ids`. Unknown IDs are skipped.
    async fn find_by_ids(&self, ids: &[PromotionId]) -> Result<Vec<Promotion>, RepositoryError>;

    /// Distinct merchant names, alphabetically.
    async fn merchants(&self) -> Result<Vec<String>, RepositoryError>;

    /// Add a promotion to the catalog.
    ///
    /// Returns `RepositoryError::Conflict` if the ID is already taken.
    async fn insert(&self, promotion: &Promotion) -> Result<(), RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Database row for `catalog.promotion`.
#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: String,
    title: String,
    merchant: String,
    reward_amount: Decimal,
    reward_currency: String,
    description: String,
    terms: String,
    thumbnail_url: String,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<PromotionRow> for Promotion {
    fn from(row: PromotionRow) -> Self {
        Self {
            id: PromotionId::new(row.id),
            title: row.title,
            merchant: row.merchant,
            reward_amount: row.reward_amount,
            reward_currency: RewardCurrency::new(row.reward_currency),
            description: row.description,
            terms: row.terms,
            thumbnail_url: row.thumbnail_url,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

const PROMOTION_COLUMNS: &str = "id, title, merchant, reward_amount, reward_currency, \
     description, terms, thumbnail_url, expires_at, created_at";

const LISTING_ORDER: &str = " ORDER BY expires_at ASC NULLS LAST, created_at DESC, id ASC";

/// `PostgreSQL` promotion repository.
#[derive(Debug, Clone)]
pub struct PgPromotionStore {
    pool: PgPool,
}

impl PgPromotionStore {
    /// Create a new promotion repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete every promotion (and, by cascade, every favorite).
    ///
    /// Used by `dealbook-cli seed --clear`. Audit events are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.promotion")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Append the `WHERE` clause for `filter`.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &PromotionFilter) {
    qb.push(" WHERE TRUE");

    if let Some(q) = filter.search_term() {
        let pattern = like_pattern(q);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR merchant ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(merchant) = filter.merchant_name() {
        qb.push(" AND merchant = ").push_bind(merchant.to_owned());
    }

    if let Some(before) = filter.expires_before {
        qb.push(" AND expires_at <= ").push_bind(before);
    }
}

#[async_trait]
impl PromotionStore for PgPromotionStore {
    async fn find_page(
        &self,
        filter: &PromotionFilter,
        skip: u64,
        take: u32,
    ) -> Result<(Vec<Promotion>, u64), RepositoryError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog.promotion");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut page_query = QueryBuilder::<Postgres>::new("SELECT ");
        page_query.push(PROMOTION_COLUMNS).push(" FROM catalog.promotion");
        push_filters(&mut page_query, filter);
        page_query
            .push(LISTING_ORDER)
            .push(" LIMIT ")
            .push_bind(i64::from(take))
            .push(" OFFSET ")
            .push_bind(i64::try_from(skip).unwrap_or(i64::MAX));

        let rows: Vec<PromotionRow> = page_query
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        let total = u64::try_from(total)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative row count: {total}")))?;

        Ok((rows.into_iter().map(Promotion::from).collect(), total))
    }

    async fn find_by_id(&self, id: &PromotionId) -> Result<Option<Promotion>, RepositoryError> {
        let row = sqlx::query_as::<_, PromotionRow>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM catalog.promotion WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Promotion::from))
    }

    async fn find_by_ids(&self, ids: &[PromotionId]) -> Result<Vec<Promotion>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = ids.iter().map(PromotionId::as_str).collect();
        let rows = sqlx::query_as::<_, PromotionRow>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM catalog.promotion WHERE id = ANY($1){LISTING_ORDER}"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Promotion::from).collect())
    }

    async fn merchants(&self) -> Result<Vec<String>, RepositoryError> {
        let merchants = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT merchant FROM catalog.promotion ORDER BY merchant",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(merchants)
    }

    async fn insert(&self, promotion: &Promotion) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO catalog.promotion (
                id, title, merchant, reward_amount, reward_currency,
                description, terms, thumbnail_url, expires_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(promotion.id.as_str())
        .bind(&promotion.title)
        .bind(&promotion.merchant)
        .bind(promotion.reward_amount)
        .bind(promotion.reward_currency.as_str())
        .bind(&promotion.description)
        .bind(&promotion.terms)
        .bind(&promotion.thumbnail_url)
        .bind(promotion.expires_at)
        .bind(promotion.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return RepositoryError::Conflict(format!(
                    "promotion {} already exists",
                    promotion.id
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
