//! Integration tests for Dealbook.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests (no external services)
//! cargo test -p dealbook-integration-tests
//!
//! # Including PostgreSQL store tests
//! DEALBOOK_DATABASE_URL=postgres://... cargo test -p dealbook-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `http_promotions` - the axum router end to end over a [`MemoryStore`]
//! - `favorites_concurrency` - concurrent toggles through the services
//! - `postgres_store` - the `PostgreSQL` stores (ignored by default)
//!
//! This library holds the shared fixtures.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use dealbook_api::config::ApiConfig;
use dealbook_api::db::MemoryStore;
use dealbook_api::models::Promotion;
use dealbook_api::routes;
use dealbook_api::state::AppState;
use dealbook_core::{FixedClock, PromotionId};

/// The instant every test clock starts at.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap()
}

/// Build a promotion. `expires_in` is relative to [`fixed_now`].
#[must_use]
pub fn promotion(id: &str, merchant: &str, expires_in: Option<Duration>) -> Promotion {
    Promotion {
        id: PromotionId::new(id),
        title: format!("{merchant} deal {id}"),
        merchant: merchant.to_string(),
        reward_amount: Decimal::new(1050, 2),
        reward_currency: "SAR".into(),
        description: format!("Save at {merchant}."),
        terms: "Valid once per user.".to_string(),
        thumbnail_url: format!("https://via.placeholder.com/300x200?text={id}"),
        expires_at: expires_in.map(|d| fixed_now() + d),
        created_at: fixed_now() - Duration::days(10),
    }
}

/// A small catalog covering every ordering and filter case.
///
/// | id | merchant     | expires      |
/// |----|--------------|--------------|
/// | 1  | Starbucks    | in 9 days    |
/// | 2  | Burger King  | in 4 days    |
/// | 3  | Carrefour    | 1 day ago    |
/// | 4  | Costa Coffee | never        |
/// | 5  | Starbucks    | in 30 min    |
#[must_use]
pub fn sample_catalog() -> Vec<Promotion> {
    vec![
        promotion("1", "Starbucks", Some(Duration::days(9))),
        promotion("2", "Burger King", Some(Duration::days(4))),
        promotion("3", "Carrefour", Some(Duration::days(-1))),
        promotion("4", "Costa Coffee", None),
        promotion("5", "Starbucks", Some(Duration::minutes(30))),
    ]
}

/// Configuration for tests: every default, with a dummy database URL.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig::from_lookup(|key| {
        (key == "DEALBOOK_DATABASE_URL").then(|| "postgres://unused/dealbook".to_string())
    })
    .unwrap()
}

/// The full router over an in-memory store with a frozen clock.
pub struct TestApp {
    pub store: MemoryStore,
    pub clock: Arc<FixedClock>,
    router: Router,
}

impl TestApp {
    /// Build an app holding `promotions`.
    #[must_use]
    pub fn new(promotions: Vec<Promotion>) -> Self {
        let clock = Arc::new(FixedClock::new(fixed_now()));
        let store = MemoryStore::with_promotions(clock.clone(), promotions);
        let state = AppState::with_stores(
            test_config(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            clock.clone(),
        );
        Self {
            store,
            clock,
            router: routes::app(state),
        }
    }

    /// Send a request, optionally as `user`, and return status and JSON body.
    ///
    /// Non-JSON bodies come back as a JSON string.
    pub async fn send(&self, method: Method, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header("x-user-id", user);
        }
        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    /// `GET uri` as `user`.
    pub async fn get(&self, uri: &str, user: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(user)).await
    }

    /// `POST uri` as `user`.
    pub async fn post(&self, uri: &str, user: &str) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(user)).await
    }

    /// `DELETE uri` as `user`.
    pub async fn delete(&self, uri: &str, user: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(user)).await
    }
}

/// IDs of the promotions in a JSON array of promotion views.
#[must_use]
pub fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}
