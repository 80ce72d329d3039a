//! HTTP API tests over the in-memory store.
//!
//! Every request goes through the full router, middleware included.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::json;

use dealbook_core::FavoriteAction;
use dealbook_integration_tests::{TestApp, ids, sample_catalog};

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_listing_default_order_and_meta() {
    let app = TestApp::new(sample_catalog());

    let (status, body) = app.get("/promotions", "alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["items"]), ["3", "5", "2", "1", "4"]);
    assert_eq!(
        body["meta"],
        json!({"total": 5, "page": 1, "limit": 20, "totalPages": 1})
    );
}

#[tokio::test]
async fn test_listing_countdown_values() {
    let app = TestApp::new(sample_catalog());

    let (_, body) = app.get("/promotions", "alice").await;
    let days: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["daysUntilExpiry"].clone())
        .collect();

    assert_eq!(days, [json!(-1), json!(1), json!(4), json!(9), json!(null)]);
}

#[tokio::test]
async fn test_listing_pagination() {
    let app = TestApp::new(sample_catalog());

    let (_, body) = app.get("/promotions?page=2&limit=2", "alice").await;
    assert_eq!(ids(&body["items"]), ["2", "1"]);
    assert_eq!(body["meta"]["totalPages"], 3);

    let (_, last) = app.get("/promotions?page=3&limit=2", "alice").await;
    assert_eq!(ids(&last["items"]), ["4"]);
}

#[tokio::test]
async fn test_listing_past_the_end_is_empty() {
    let app = TestApp::new(sample_catalog());

    let (status, body) = app.get("/promotions?page=4&limit=2", "alice").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
    assert_eq!(
        body["meta"],
        json!({"total": 5, "page": 4, "limit": 2, "totalPages": 0})
    );
}

#[tokio::test]
async fn test_listing_search_and_merchant_filters() {
    let app = TestApp::new(sample_catalog());

    let (_, by_text) = app.get("/promotions?q=STARBUCKS", "alice").await;
    assert_eq!(ids(&by_text["items"]), ["5", "1"]);

    let (_, by_merchant) = app.get("/promotions?merchant=Starbucks", "alice").await;
    assert_eq!(ids(&by_merchant["items"]), ["5", "1"]);

    let (_, wrong_case) = app.get("/promotions?merchant=starbucks", "alice").await;
    assert!(wrong_case["items"].as_array().unwrap().is_empty());
    assert_eq!(wrong_case["meta"]["total"], 0);

    let (_, blank) = app.get("/promotions?q=&merchant=", "alice").await;
    assert_eq!(blank["meta"]["total"], 5);
}

#[tokio::test]
async fn test_listing_search_keeps_surrounding_spaces() {
    let app = TestApp::new(sample_catalog());

    let (status, leading) = app.get("/promotions?q=%20bucks", "alice").await;
    assert_eq!(status, StatusCode::OK);
    assert!(leading["items"].as_array().unwrap().is_empty());
    assert_eq!(leading["meta"]["total"], 0);

    let (_, trailing) = app.get("/promotions?q=bucks%20", "alice").await;
    assert_eq!(ids(&trailing["items"]), ["5", "1"]);
    for item in trailing["items"].as_array().unwrap() {
        let haystack = format!("{} {}", item["title"], item["description"]).to_lowercase();
        assert!(haystack.contains("bucks "), "{item}");
    }

    let (_, blank) = app.get("/promotions?q=%20%20", "alice").await;
    assert_eq!(blank["meta"]["total"], 5);
}

#[tokio::test]
async fn test_listing_expires_before() {
    let app = TestApp::new(sample_catalog());

    // Midnight UTC on 2025-12-06
    let (_, by_date) = app.get("/promotions?expiresBefore=2025-12-06", "alice").await;
    assert_eq!(ids(&by_date["items"]), ["3", "5", "2"]);

    let (_, by_instant) = app
        .get("/promotions?expiresBefore=2025-12-01T12:30:00Z", "alice")
        .await;
    assert_eq!(ids(&by_instant["items"]), ["3", "5"]);
}

#[tokio::test]
async fn test_listing_rejects_bad_parameters() {
    let app = TestApp::new(sample_catalog());

    for uri in [
        "/promotions?limit=101",
        "/promotions?limit=0",
        "/promotions?page=0",
        "/promotions?limit=abc",
        "/promotions?expiresBefore=next-week",
    ] {
        let (status, body) = app.get(uri, "alice").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["statusCode"], 400, "{uri}");
        assert!(body["message"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let app = TestApp::new(sample_catalog());
    app.store.set_unavailable(true).await;

    let (status, body) = app.get("/promotions", "alice").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"statusCode": 500, "message": "Internal server error"})
    );
}

// ============================================================================
// Single promotion and merchants
// ============================================================================

#[tokio::test]
async fn test_show_promotion() {
    let app = TestApp::new(sample_catalog());

    let (status, body) = app.get("/promotions/2", "alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "2");
    assert_eq!(body["merchant"], "Burger King");
    assert_eq!(body["rewardAmount"], "10.50");
    assert_eq!(body["rewardCurrency"], "SAR");
    assert_eq!(body["isFavorite"], false);
    assert_eq!(body["daysUntilExpiry"], 4);
}

#[tokio::test]
async fn test_show_missing_promotion() {
    let app = TestApp::new(sample_catalog());

    let (status, body) = app.get("/promotions/nope", "alice").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"statusCode": 404, "message": "Promotion nope not found"})
    );
}

#[tokio::test]
async fn test_merchants_are_distinct_and_sorted() {
    let app = TestApp::new(sample_catalog());

    let (status, body) = app.get("/promotions/merchants", "alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!(["Burger King", "Carrefour", "Costa Coffee", "Starbucks"])
    );
}

// ============================================================================
// Favorites
// ============================================================================

#[tokio::test]
async fn test_favorite_is_idempotent() {
    let app = TestApp::new(sample_catalog());

    let (first, body) = app.post("/promotions/2/favorite", "alice").await;
    let (second, again) = app.post("/promotions/2/favorite", "alice").await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CREATED);
    assert_eq!(body, json!({"promotionId": "2", "isFavorite": true}));
    assert_eq!(again, body);
    assert_eq!(app.store.favorite_count().await, 1);
    assert_eq!(app.store.audit_events().await.len(), 1);
}

#[tokio::test]
async fn test_favorite_flags_are_per_user() {
    let app = TestApp::new(sample_catalog());
    app.post("/promotions/2/favorite", "alice").await;

    let (_, alice) = app.get("/promotions/2", "alice").await;
    let (_, bob) = app.get("/promotions/2", "bob").await;

    assert_eq!(alice["isFavorite"], true);
    assert_eq!(bob["isFavorite"], false);

    let (_, listing) = app.get("/promotions", "alice").await;
    let flagged: Vec<_> = listing["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|item| item["isFavorite"] == true)
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(flagged, ["2"]);
}

#[tokio::test]
async fn test_unfavorite_round_trip() {
    let app = TestApp::new(sample_catalog());

    app.post("/promotions/2/favorite", "alice").await;
    let (status, body) = app.delete("/promotions/2/favorite", "alice").await;
    let (noop_status, noop) = app.delete("/promotions/2/favorite", "alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"promotionId": "2", "isFavorite": false}));
    assert_eq!(noop_status, StatusCode::OK);
    assert_eq!(noop, body);

    let actions: Vec<_> = app
        .store
        .audit_events()
        .await
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        [FavoriteAction::Favorited, FavoriteAction::Unfavorited]
    );
}

#[tokio::test]
async fn test_favorite_missing_promotion() {
    let app = TestApp::new(sample_catalog());

    let (post, body) = app.post("/promotions/nope/favorite", "alice").await;
    let (delete, _) = app.delete("/promotions/nope/favorite", "alice").await;

    assert_eq!(post, StatusCode::NOT_FOUND);
    assert_eq!(delete, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Promotion nope not found");
    assert_eq!(app.store.favorite_count().await, 0);
    assert!(app.store.audit_events().await.is_empty());
}

#[tokio::test]
async fn test_favorites_summary() {
    let app = TestApp::new(sample_catalog());
    for id in ["4", "3", "1"] {
        app.post(&format!("/promotions/{id}/favorite"), "alice").await;
    }

    let (status, body) = app.get("/promotions/favorites", "alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["active"]), ["1", "4"]);
    assert_eq!(ids(&body["expired"]), ["3"]);
    assert_eq!(body["stats"], json!({"total": 3, "active": 2, "expired": 1}));
    assert!(
        body["active"]
            .as_array()
            .unwrap()
            .iter()
            .all(|item| item["isFavorite"] == true)
    );
}

#[tokio::test]
async fn test_favorites_summary_follows_the_clock() {
    let app = TestApp::new(sample_catalog());
    app.post("/promotions/5/favorite", "alice").await;

    let (_, before) = app.get("/promotions/favorites", "alice").await;
    assert_eq!(ids(&before["active"]), ["5"]);

    app.clock.advance(Duration::minutes(30));

    let (_, after) = app.get("/promotions/favorites", "alice").await;
    assert!(after["active"].as_array().unwrap().is_empty());
    assert_eq!(ids(&after["expired"]), ["5"]);
    assert_eq!(after["expired"][0]["daysUntilExpiry"], 0);
}

#[tokio::test]
async fn test_empty_favorites_summary() {
    let app = TestApp::new(sample_catalog());

    let (status, body) = app.get("/promotions/favorites", "nobody").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "active": [],
            "expired": [],
            "stats": {"total": 0, "active": 0, "expired": 0}
        })
    );
}

#[tokio::test]
async fn test_deleted_promotion_drops_out_of_favorites() {
    let app = TestApp::new(sample_catalog());
    app.post("/promotions/1/favorite", "alice").await;
    app.post("/promotions/2/favorite", "alice").await;

    app.store
        .remove_promotion(&dealbook_core::PromotionId::new("1"))
        .await;

    let (_, body) = app.get("/promotions/favorites", "alice").await;
    assert_eq!(ids(&body["active"]), ["2"]);
    assert_eq!(body["stats"]["total"], 1);
}

// ============================================================================
// Caller identity
// ============================================================================

#[tokio::test]
async fn test_missing_user_header_acts_as_demo_user() {
    let app = TestApp::new(sample_catalog());

    let (status, _) = app
        .send(Method::POST, "/promotions/2/favorite", None)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, demo) = app.get("/promotions/favorites", "demo-user-id").await;
    assert_eq!(ids(&demo["active"]), ["2"]);
}

#[tokio::test]
async fn test_blank_user_header_is_rejected() {
    let app = TestApp::new(sample_catalog());

    let (status, body) = app.get("/promotions", "").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
}
