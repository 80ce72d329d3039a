//! Promotion domain types, listing filters and pagination.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dealbook_core::{PromotionId, Reward, RewardCurrency, days_until_expiry};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A time-limited promotional offer (domain type).
///
/// Read-only to this service: promotions are created by catalog
/// administration (or the seed command) and never modified here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    /// Unique, immutable promotion ID.
    pub id: PromotionId,
    /// Headline shown on the card.
    pub title: String,
    /// Merchant offering the promotion.
    pub merchant: String,
    /// Reward amount, serialized as a decimal string.
    pub reward_amount: Decimal,
    /// Reward currency code or sentinel (`FREE_ITEM`, `PERCENT`).
    pub reward_currency: RewardCurrency,
    /// Long-form description.
    pub description: String,
    /// Terms and conditions.
    pub terms: String,
    /// Card thumbnail.
    pub thumbnail_url: String,
    /// When the promotion stops being redeemable. `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the promotion was created.
    pub created_at: DateTime<Utc>,
}

impl Promotion {
    /// The reward as a single value.
    #[must_use]
    pub fn reward(&self) -> Reward {
        Reward::new(self.reward_amount, self.reward_currency.clone())
    }

    /// Enrich this promotion with per-user state relative to `now`.
    #[must_use]
    pub fn into_view(self, is_favorite: bool, now: DateTime<Utc>) -> PromotionView {
        let days_until_expiry = days_until_expiry(self.expires_at, now);
        PromotionView {
            promotion: self,
            is_favorite,
            days_until_expiry,
        }
    }
}

/// Catalog listing order.
///
/// Soonest expiry first with never-expiring promotions last, then newest
/// first. The ID is a final tie-break so pagination is deterministic.
#[must_use]
pub fn listing_order(a: &Promotion, b: &Promotion) -> Ordering {
    let by_expiry = match (a.expires_at, b.expires_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_expiry
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// A promotion as seen by one user at one instant. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionView {
    /// The underlying promotion.
    #[serde(flatten)]
    pub promotion: Promotion,
    /// Whether the requesting user has favorited this promotion.
    pub is_favorite: bool,
    /// Whole days until expiry, rounded up. `None` when it never expires.
    pub days_until_expiry: Option<i64>,
}

/// Catalog listing filter.
///
/// Empty strings are treated the same as absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionFilter {
    /// Case-insensitive substring matched against title, merchant or description.
    pub q: Option<String>,
    /// Exact (case-sensitive) merchant name.
    pub merchant: Option<String>,
    /// Keep promotions expiring at or before this instant.
    pub expires_before: Option<DateTime<Utc>>,
}

impl PromotionFilter {
    /// The free-text search term, if one is active.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.q.as_deref().filter(|q| !q.is_empty())
    }

    /// The merchant name, if the merchant filter is active.
    #[must_use]
    pub fn merchant_name(&self) -> Option<&str> {
        self.merchant.as_deref().filter(|m| !m.is_empty())
    }

    /// Whether `promotion` satisfies every active filter.
    ///
    /// Promotions without an expiry never satisfy `expires_before`.
    #[must_use]
    pub fn matches(&self, promotion: &Promotion) -> bool {
        if let Some(q) = self.search_term() {
            let needle = q.to_lowercase();
            let hit = [&promotion.title, &promotion.merchant, &promotion.description]
                .into_iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(merchant) = self.merchant_name()
            && promotion.merchant != merchant
        {
            return false;
        }

        if let Some(before) = self.expires_before {
            return promotion.expires_at.is_some_and(|at| at <= before);
        }

        true
    }
}

/// Errors raised when building a [`PageRequest`] from caller input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageRequestError {
    /// Page numbers start at 1.
    #[error("page must be at least 1 (got {0})")]
    InvalidPage(u32),

    /// Page size outside `[1, MAX_PAGE_SIZE]`.
    #[error("limit must be between 1 and {MAX_PAGE_SIZE} (got {0})")]
    InvalidPageSize(u32),
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Validate a page number and page size.
    ///
    /// # Errors
    ///
    /// Returns `PageRequestError` if `page` is zero or `page_size` is outside
    /// `[1, MAX_PAGE_SIZE]`.
    pub const fn new(page: u32, page_size: u32) -> Result<Self, PageRequestError> {
        if page == 0 {
            return Err(PageRequestError::InvalidPage(page));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(PageRequestError::InvalidPageSize(page_size));
        }
        Ok(Self { page, page_size })
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Items per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of matching rows to skip.
    #[must_use]
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Number of pages needed for `total` rows.
    #[must_use]
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.page_size))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionsPage {
    /// Promotions on this page, in listing order.
    pub items: Vec<PromotionView>,
    /// Pagination metadata.
    pub meta: PageMeta,
}

/// Pagination metadata for a [`PromotionsPage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Number of promotions matching the filter, across all pages.
    pub total: u64,
    /// Requested page.
    pub page: u32,
    /// Requested page size.
    pub limit: u32,
    /// Page count. Zero whenever the requested page came back empty.
    pub total_pages: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 20, 0, 0, 0).unwrap()
    }

    fn promo(id: &str, expires_in_days: Option<i64>, created_days_ago: i64) -> Promotion {
        Promotion {
            id: PromotionId::new(id),
            title: format!("Offer {id}"),
            merchant: "Starbucks".to_string(),
            reward_amount: Decimal::from(10),
            reward_currency: "SAR".into(),
            description: "Get 10% discount on all drinks.".to_string(),
            terms: "Valid once per user.".to_string(),
            thumbnail_url: "https://example.com/thumb.png".to_string(),
            expires_at: expires_in_days.map(|d| now() + Duration::days(d)),
            created_at: now() - Duration::days(created_days_ago),
        }
    }

    #[test]
    fn test_listing_order_nulls_last() {
        let mut items = vec![promo("a", Some(5), 0), promo("b", None, 0), promo("c", Some(-1), 0)];
        items.sort_by(listing_order);
        let ids: Vec<_> = items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_listing_order_newest_first_on_tie() {
        let mut items = vec![promo("old", Some(3), 10), promo("new", Some(3), 1)];
        items.sort_by(listing_order);
        assert_eq!(items[0].id.as_str(), "new");
    }

    #[test]
    fn test_filter_search_is_case_insensitive_across_fields() {
        let p = promo("1", Some(1), 0);
        let by_title = PromotionFilter {
            q: Some("OFFER".to_string()),
            ..Default::default()
        };
        let by_merchant = PromotionFilter {
            q: Some("starb".to_string()),
            ..Default::default()
        };
        let by_description = PromotionFilter {
            q: Some("Drinks".to_string()),
            ..Default::default()
        };
        let miss = PromotionFilter {
            q: Some("pizza".to_string()),
            ..Default::default()
        };
        assert!(by_title.matches(&p));
        assert!(by_merchant.matches(&p));
        assert!(by_description.matches(&p));
        assert!(!miss.matches(&p));
    }

    #[test]
    fn test_filter_merchant_is_exact() {
        let p = promo("1", Some(1), 0);
        let exact = PromotionFilter {
            merchant: Some("Starbucks".to_string()),
            ..Default::default()
        };
        let wrong_case = PromotionFilter {
            merchant: Some("starbucks".to_string()),
            ..Default::default()
        };
        assert!(exact.matches(&p));
        assert!(!wrong_case.matches(&p));
    }

    #[test]
    fn test_filter_expires_before_is_inclusive() {
        let p = promo("1", Some(2), 0);
        let at = PromotionFilter {
            expires_before: Some(now() + Duration::days(2)),
            ..Default::default()
        };
        let earlier = PromotionFilter {
            expires_before: Some(now() + Duration::days(1)),
            ..Default::default()
        };
        assert!(at.matches(&p));
        assert!(!earlier.matches(&p));
        assert!(!at.matches(&promo("never", None, 0)));
    }

    #[test]
    fn test_empty_strings_disable_filters() {
        let filter = PromotionFilter {
            q: Some(String::new()),
            merchant: Some(String::new()),
            expires_before: None,
        };
        assert!(filter.search_term().is_none());
        assert!(filter.merchant_name().is_none());
        assert!(filter.matches(&promo("1", None, 0)));
    }

    #[test]
    fn test_page_request_bounds() {
        assert_eq!(PageRequest::new(0, 10), Err(PageRequestError::InvalidPage(0)));
        assert_eq!(PageRequest::new(1, 0), Err(PageRequestError::InvalidPageSize(0)));
        assert_eq!(PageRequest::new(1, 101), Err(PageRequestError::InvalidPageSize(101)));
        assert!(PageRequest::new(1, 100).is_ok());
    }

    #[test]
    fn test_page_request_arithmetic() {
        let page = PageRequest::new(3, 10).unwrap();
        assert_eq!(page.skip(), 20);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(5), 1);
        assert_eq!(page.total_pages(20), 2);
        assert_eq!(page.total_pages(21), 3);
    }

    #[test]
    fn test_view_serializes_flat_camel_case() {
        let view = promo("1", None, 0).into_view(true, now());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "1");
        assert_eq!(json["rewardAmount"], "10");
        assert_eq!(json["rewardCurrency"], "SAR");
        assert_eq!(json["isFavorite"], true);
        assert!(json["daysUntilExpiry"].is_null());
        assert!(json["expiresAt"].is_null());
    }
}
