//! Catalog queries.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::instrument;

use dealbook_core::{Clock, PromotionId, UserId};

use super::ServiceError;
use crate::db::{FavoriteStore, PromotionStore};
use crate::models::{PageMeta, PageRequest, PromotionFilter, PromotionView, PromotionsPage};

/// Builds catalog pages enriched with per-user favorite flags and expiry
/// countdowns.
#[derive(Clone)]
pub struct CatalogService {
    promotions: Arc<dyn PromotionStore>,
    favorites: Arc<dyn FavoriteStore>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    /// Create a new catalog service.
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

    /// One page of promotions matching `filter`, as seen by `user`.
    ///
    /// Only the favorites of the promotions on this page are looked up. An
    /// empty page reports `total_pages = 0` even when `total` is non-zero
    /// (a page past the end).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a store call fails.
    #[instrument(skip(self, filter), fields(page = page.page(), limit = page.page_size()))]
    pub async fn query(
        &self,
        filter: &PromotionFilter,
        page: PageRequest,
        user: &UserId,
    ) -> Result<PromotionsPage, ServiceError> {
        let (promotions, total) = self
            .promotions
            .find_page(filter, page.skip(), page.page_size())
            .await?;

        if promotions.is_empty() {
            return Ok(PromotionsPage {
                items: Vec::new(),
                meta: PageMeta {
                    total,
                    page: page.page(),
                    limit: page.page_size(),
                    total_pages: 0,
                },
            });
        }

        let ids: Vec<PromotionId> = promotions.iter().map(|p| p.id.clone()).collect();
        let favorited: HashSet<PromotionId> = self
            .favorites
            .find_by_user_and_ids(user, &ids)
            .await?
            .into_iter()
            .map(|f| f.promotion_id)
            .collect();

        let now = self.clock.now();
        let items = promotions
            .into_iter()
            .map(|p| {
                let is_favorite = favorited.contains(&p.id);
                p.into_view(is_favorite, now)
            })
            .collect();

        tracing::debug!(total, favorites = favorited.len(), "catalog page built");

        Ok(PromotionsPage {
            items,
            meta: PageMeta {
                total,
                page: page.page(),
                limit: page.page_size(),
                total_pages: page.total_pages(total),
            },
        })
    }

    /// A single promotion, as seen by `user`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the promotion does not exist.
    /// Returns `ServiceError::Repository` if a store call fails.
    #[instrument(skip(self))]
    pub async fn get_one(
        &self,
        user: &UserId,
        id: &PromotionId,
    ) -> Result<PromotionView, ServiceError> {
        let promotion = self
            .promotions
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))?;

        let is_favorite = self.favorites.exists(user, id).await?;

        Ok(promotion.into_view(is_favorite, self.clock.now()))
    }

    /// Distinct merchant names, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store call fails.
    pub async fn merchants(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.promotions.merchants().await?)
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod listing_properties {
    use std::cmp::Reverse;

    use chrono::{DateTime, Duration, Utc};
    use proptest::prelude::*;

    use super::*;
    use crate::models::Promotion;
    use crate::services::fixtures::{now, promo, store_with};

    const MERCHANTS: [&str; 3] = ["Starbucks", "Costa Coffee", "Extra"];
    const TITLES: [&str; 4] = ["10% off drinks", "Free coffee", "Weekend deal", "Cashback offer"];
    const SEARCHES: [&str; 6] = ["star", "OFF", "coffee", " co", "deal", "x"];

    /// (merchant, title, expires in hours, created hours ago)
    type Row = (usize, usize, Option<i64>, i64);

    fn catalog(rows: &[Row]) -> Vec<Promotion> {
        rows.iter()
            .enumerate()
            .map(|(i, &(merchant, title, expires_h, created_h))| {
                let mut p = promo(&format!("p{i:02}"), expires_h.map(Duration::hours));
                p.merchant = MERCHANTS[merchant].to_string();
                p.title = TITLES[title].to_string();
                p.description = format!("Offer from {}", p.merchant);
                p.created_at = now() - Duration::hours(created_h);
                p
            })
            .collect()
    }

    fn satisfies(
        p: &Promotion,
        q: Option<&str>,
        merchant: Option<&str>,
        before: Option<DateTime<Utc>>,
    ) -> bool {
        let text = q.is_none_or(|q| {
            let q = q.to_lowercase();
            [&p.title, &p.merchant, &p.description]
                .iter()
                .any(|field| field.to_lowercase().contains(&q))
        });
        let by_merchant = merchant.is_none_or(|m| p.merchant == m);
        let by_expiry = before.is_none_or(|b| p.expires_at.is_some_and(|at| at <= b));
        text && by_merchant && by_expiry
    }

    proptest! {
        #[test]
        fn test_pages_hold_matching_items_in_listing_order(
            rows in prop::collection::vec(
                (0..3usize, 0..4usize, prop::option::of(-72i64..72), 0i64..240),
                0..25,
            ),
            q in prop::option::of(prop::sample::select(SEARCHES.to_vec())),
            merchant in prop::option::of(prop::sample::select(MERCHANTS.to_vec())),
            before_h in prop::option::of(-48i64..96),
            page_no in 1u32..5,
            page_size in 1u32..8,
        ) {
            let promotions = catalog(&rows);
            let before = before_h.map(|h| now() + Duration::hours(h));
            let filter = PromotionFilter {
                q: q.map(str::to_string),
                merchant: merchant.map(str::to_string),
                expires_before: before,
            };

            let mut expected: Vec<Promotion> = promotions
                .iter()
                .filter(|p| satisfies(p, q, merchant, before))
                .cloned()
                .collect();
            expected.sort_by_key(|p| {
                (p.expires_at.is_none(), p.expires_at, Reverse(p.created_at), p.id.clone())
            });

            let (store, clock) = store_with(promotions);
            let service = CatalogService::new(Arc::new(store.clone()), Arc::new(store), clock);
            let request = PageRequest::new(page_no, page_size).unwrap();
            let page = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap()
                .block_on(service.query(&filter, request, &UserId::new("u1")))
                .unwrap();

            for view in &page.items {
                prop_assert!(satisfies(&view.promotion, q, merchant, before));
            }
            for pair in page.items.windows(2) {
                let (a, b) = (&pair[0].promotion, &pair[1].promotion);
                let ordered = match (a.expires_at, b.expires_at) {
                    (Some(x), Some(y)) if x != y => x < y,
                    (Some(_), None) => true,
                    (None, Some(_)) => false,
                    _ => a.created_at >= b.created_at,
                };
                prop_assert!(ordered, "{} before {}", a.id, b.id);
            }

            let expected_ids: Vec<_> = expected
                .iter()
                .skip(usize::try_from(request.skip()).unwrap())
                .take(usize::try_from(page_size).unwrap())
                .map(|p| p.id.clone())
                .collect();
            let ids: Vec<_> = page.items.iter().map(|v| v.promotion.id.clone()).collect();
            prop_assert_eq!(ids, expected_ids);
            prop_assert_eq!(page.meta.total, u64::try_from(expected.len()).unwrap());
            if page.items.is_empty() {
                prop_assert_eq!(page.meta.total_pages, 0);
            } else {
                prop_assert_eq!(page.meta.total_pages, request.total_pages(page.meta.total));
            }
        }
    }
}
