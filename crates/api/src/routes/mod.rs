//! HTTP route handlers for the promotions API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness check
//! GET    /health/ready               - Readiness check (store reachable)
//!
//! # Promotions
//! GET    /promotions                 - Filtered, paginated listing
//! GET    /promotions/favorites       - Caller's favorites (active / expired)
//! GET    /promotions/merchants       - Distinct merchant names
//! GET    /promotions/{id}            - Single promotion
//! POST   /promotions/{id}/favorite   - Add favorite
//! DELETE /promotions/{id}/favorite   - Remove favorite
//! ```

pub mod health;
pub mod promotions;

use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::{Router, middleware, routing::get};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    REQUEST_ID_HEADER, USER_ID_HEADER, request_id_middleware, timeout_error_body,
};
use crate::state::AppState;

/// Create the promotion routes router.
pub fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(promotions::index))
        .route("/favorites", get(promotions::favorites))
        .route("/merchants", get(promotions::merchants))
        .route("/{id}", get(promotions::show))
        .route(
            "/{id}/favorite",
            axum::routing::post(promotions::favorite).delete(promotions::unfavorite),
        )
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/promotions", promotion_routes())
}

/// Build the complete application with its middleware stack.
///
/// Sentry layers are added by the binary, outside this stack.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_origin);
    let timeout = TimeoutLayer::new(state.config().request_timeout);

    routes()
        .layer(timeout)
        .layer(middleware::map_response(timeout_error_body))
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// CORS for the configured frontend origin.
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = HeaderValue::from_str(origin).map_or_else(
        |_| {
            tracing::warn!(origin, "invalid CORS origin, cross-origin requests disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        },
        AllowOrigin::exact,
    );

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}
