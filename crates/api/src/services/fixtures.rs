//! Shared fixtures for service tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use dealbook_core::{FixedClock, PromotionId};

use crate::db::MemoryStore;
use crate::models::Promotion;

/// The instant every test clock starts at.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 20, 9, 0, 0).unwrap()
}

/// A promotion expiring `expires_in` after [`now`] (never, if `None`).
pub fn promo(id: &str, expires_in: Option<Duration>) -> Promotion {
    Promotion {
        id: PromotionId::new(id),
        title: format!("Offer {id}"),
        merchant: "Starbucks".to_string(),
        reward_amount: Decimal::from(10),
        reward_currency: "SAR".into(),
        description: "Get 10 SAR off any drink.".to_string(),
        terms: "Valid once per user.".to_string(),
        thumbnail_url: "https://example.com/thumb.png".to_string(),
        expires_at: expires_in.map(|d| now() + d),
        created_at: now() - Duration::days(30),
    }
}

/// A memory store holding `promotions`, and the clock it stamps rows with.
pub fn store_with(promotions: Vec<Promotion>) -> (MemoryStore, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(now()));
    let store = MemoryStore::with_promotions(clock.clone(), promotions);
    (store, clock)
}
