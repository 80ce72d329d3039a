//! Promotion route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use dealbook_core::PromotionId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::CurrentUser;
use crate::models::{
    DEFAULT_PAGE_SIZE, FavoriteStatus, FavoritesSummary, PageRequest, PromotionFilter,
    PromotionView, PromotionsPage,
};
use crate::state::AppState;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Free-text search over title, merchant and description.
    pub q: Option<String>,
    /// Exact merchant name.
    pub merchant: Option<String>,
    /// RFC 3339 instant or `YYYY-MM-DD` (midnight UTC).
    pub expires_before: Option<String>,
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, 1 to 100.
    pub limit: Option<u32>,
}

impl ListQuery {
    /// Validate into a filter and a page request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an out-of-range page or limit, or
    /// an unparseable `expiresBefore`.
    pub fn into_parts(self) -> Result<(PromotionFilter, PageRequest)> {
        let page = PageRequest::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let expires_before = match self.expires_before.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_instant(raw).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "expiresBefore must be an RFC 3339 timestamp or YYYY-MM-DD date (got {raw:?})"
                ))
            })?),
        };

        // All-whitespace search is no search; anything else is matched as sent.
        let filter = PromotionFilter {
            q: self.q.filter(|q| !q.trim().is_empty()),
            merchant: self.merchant,
            expires_before,
        };

        Ok((filter, page))
    }
}

/// Parse an RFC 3339 instant, or a bare date as midnight UTC.
fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// List promotions.
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PromotionsPage>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (filter, page) = query.into_parts()?;

    let page = state.catalog().query(&filter, page, &user).await?;
    Ok(Json(page))
}

/// Show one promotion.
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PromotionView>> {
    let view = state
        .catalog()
        .get_one(&user, &PromotionId::new(id))
        .await?;
    Ok(Json(view))
}

/// Distinct merchant names.
pub async fn merchants(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.catalog().merchants().await?))
}

/// The caller's favorites, split into active and expired.
pub async fn favorites(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<FavoritesSummary>> {
    Ok(Json(state.summary().summarize(&user).await?))
}

/// Add a promotion to the caller's favorites.
pub async fn favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<FavoriteStatus>)> {
    add_breadcrumb("favorites", "Favorite promotion", Some(&[("promotion_id", id.as_str())]));
    let status = state
        .favorites()
        .favorite(&user, &PromotionId::new(id))
        .await?;
    Ok((StatusCode::CREATED, Json(status)))
}

/// Remove a promotion from the caller's favorites.
pub async fn unfavorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<FavoriteStatus>> {
    add_breadcrumb("favorites", "Unfavorite promotion", Some(&[("promotion_id", id.as_str())]));
    let status = state
        .favorites()
        .unfavorite(&user, &PromotionId::new(id))
        .await?;
    Ok(Json(status))
}
