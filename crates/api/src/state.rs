//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use dealbook_core::{Clock, SystemClock};

use crate::config::ApiConfig;
use crate::db::{FavoriteStore, PgFavoriteStore, PgPromotionStore, PromotionStore};
use crate::services::{CatalogService, FavoritesService, SummaryService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration and the promotion services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    promotions: Arc<dyn PromotionStore>,
    catalog: CatalogService,
    favorites: FavoritesService,
    summary: SummaryService,
}

impl AppState {
    /// Create application state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        Self::with_stores(
            config,
            Arc::new(PgPromotionStore::new(pool.clone())),
            Arc::new(PgFavoriteStore::new(pool)),
            Arc::new(SystemClock),
        )
    }

    /// Create application state over arbitrary stores and clock.
    ///
    /// Tests pass a [`MemoryStore`](crate::db::MemoryStore) and a
    /// [`FixedClock`](dealbook_core::FixedClock).
    #[must_use]
    pub fn with_stores(
        config: ApiConfig,
        promotions: Arc<dyn PromotionStore>,
        favorites: Arc<dyn FavoriteStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog =
            CatalogService::new(Arc::clone(&promotions), Arc::clone(&favorites), Arc::clone(&clock));
        let toggles = FavoritesService::new(Arc::clone(&promotions), Arc::clone(&favorites));
        let summary = SummaryService::new(Arc::clone(&promotions), favorites, clock);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                promotions,
                catalog,
                favorites: toggles,
                summary,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the promotion store (readiness checks).
    #[must_use]
    pub fn promotions(&self) -> &dyn PromotionStore {
        self.inner.promotions.as_ref()
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the favorites service.
    #[must_use]
    pub fn favorites(&self) -> &FavoritesService {
        &self.inner.favorites
    }

    /// Get a reference to the favorites summary service.
    #[must_use]
    pub fn summary(&self) -> &SummaryService {
        &self.inner.summary
    }
}
