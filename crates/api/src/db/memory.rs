//! In-memory store for tests and local demos.
//!
//! A single [`MemoryStore`] implements every store trait over shared state
//! guarded by a tokio [`Mutex`]. A favorites unit holds the lock for its
//! whole lifetime and stages its writes, applying them only on commit.
//!
//! The store can also be told to misbehave: report itself unavailable, fail
//! or stall audit appends, or lose an insert race to a phantom concurrent
//! writer. Tests use these to exercise failure paths in the services.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use dealbook_core::{
    AuditEventId, Clock, FavoriteAction, FavoriteId, PromotionId, SystemClock, UserId,
};

use super::{AuditLog, FavoriteStore, FavoriteUnit, InsertOutcome, PromotionStore, RepositoryError};
use crate::models::{AuditEvent, Favorite, Promotion, PromotionFilter, listing_order};

type Pair = (UserId, PromotionId);

#[derive(Debug, Default)]
struct State {
    promotions: BTreeMap<PromotionId, Promotion>,
    favorites: BTreeMap<Pair, Favorite>,
    audit: Vec<AuditEvent>,
    unavailable: bool,
    fail_audit: bool,
    audit_delay: Option<Duration>,
    lost_races: HashSet<Pair>,
}

impl State {
    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

/// In-memory implementation of [`PromotionStore`], [`FavoriteStore`] and
/// [`AuditLog`]. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store stamping rows with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping rows with `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    /// Create a store preloaded with `promotions`.
    ///
    /// Later entries replace earlier ones with the same ID.
    #[must_use]
    pub fn with_promotions(
        clock: Arc<dyn Clock>,
        promotions: impl IntoIterator<Item = Promotion>,
    ) -> Self {
        let state = State {
            promotions: promotions
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            clock,
        }
    }

    /// Make every operation fail as if the database were unreachable.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Make audit appends fail.
    pub async fn set_fail_audit(&self, fail: bool) {
        self.state.lock().await.fail_audit = fail;
    }

    /// Delay every audit append by `delay` (while holding the unit's lock).
    pub async fn set_audit_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.audit_delay = delay;
    }

    /// Have the next insert for the pair lose a race.
    ///
    /// The insert behaves as if another writer committed the same favorite
    /// between this unit's existence check and its insert: the row appears
    /// and the insert reports [`InsertOutcome::Duplicate`].
    pub async fn lose_next_insert_race(&self, user: &UserId, promotion: &PromotionId) {
        self.state
            .lock()
            .await
            .lost_races
            .insert((user.clone(), promotion.clone()));
    }

    /// Every audit event, oldest first.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.state.lock().await.audit.clone()
    }

    /// Total number of favorite rows across all users.
    pub async fn favorite_count(&self) -> usize {
        self.state.lock().await.favorites.len()
    }

    /// Remove a promotion, cascading to its favorites like the database does.
    pub async fn remove_promotion(&self, id: &PromotionId) -> Option<Promotion> {
        let mut state = self.state.lock().await;
        state.favorites.retain(|(_, promotion), _| promotion != id);
        state.promotions.remove(id)
    }
}

fn sorted(mut promotions: Vec<Promotion>) -> Vec<Promotion> {
    promotions.sort_by(listing_order);
    promotions
}

#[async_trait]
impl PromotionStore for MemoryStore {
    async fn find_page(
        &self,
        filter: &PromotionFilter,
        skip: u64,
        take: u32,
    ) -> Result<(Vec<Promotion>, u64), RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;

        let matching = sorted(
            state
                .promotions
                .values()
                .filter(|p| filter.matches(p))
                .cloned()
                .collect(),
        );
        let total = matching.len() as u64;
        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(take).unwrap_or(usize::MAX);
        let page = matching.into_iter().skip(skip).take(take).collect();

        Ok((page, total))
    }

    async fn find_by_id(&self, id: &PromotionId) -> Result<Option<Promotion>, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state.promotions.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[PromotionId]) -> Result<Vec<Promotion>, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;

        let wanted: HashSet<&PromotionId> = ids.iter().collect();
        Ok(sorted(
            state
                .promotions
                .values()
                .filter(|p| wanted.contains(&p.id))
                .cloned()
                .collect(),
        ))
    }

    async fn merchants(&self) -> Result<Vec<String>, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;

        let mut merchants: Vec<String> = state
            .promotions
            .values()
            .map(|p| p.merchant.clone())
            .collect();
        merchants.sort();
        merchants.dedup();
        Ok(merchants)
    }

    async fn insert(&self, promotion: &Promotion) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.check_available()?;

        if state.promotions.contains_key(&promotion.id) {
            return Err(RepositoryError::Conflict(format!(
                "promotion {} already exists",
                promotion.id
            )));
        }
        state
            .promotions
            .insert(promotion.id.clone(), promotion.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.state.lock().await.check_available()
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn exists(
        &self,
        user: &UserId,
        promotion: &PromotionId,
    ) -> Result<bool, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state
            .favorites
            .contains_key(&(user.clone(), promotion.clone())))
    }

    async fn find_by_user(&self, user: &UserId) -> Result<Vec<Favorite>, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state
            .favorites
            .values()
            .filter(|f| &f.user_id == user)
            .cloned()
            .collect())
    }

    async fn find_by_user_and_ids(
        &self,
        user: &UserId,
        ids: &[PromotionId],
    ) -> Result<Vec<Favorite>, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state
            .favorites
            .values()
            .filter(|f| &f.user_id == user && ids.contains(&f.promotion_id))
            .cloned()
            .collect())
    }

    async fn count_by_user(&self, user: &UserId) -> Result<u64, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state.favorites.keys().filter(|(u, _)| u == user).count() as u64)
    }

    async fn begin(
        &self,
        user: &UserId,
        promotion: &PromotionId,
    ) -> Result<Box<dyn FavoriteUnit>, RepositoryError> {
        let state = Arc::clone(&self.state).lock_owned().await;
        state.check_available()?;

        Ok(Box::new(MemoryFavoriteUnit {
            state,
            clock: Arc::clone(&self.clock),
            pair: (user.clone(), promotion.clone()),
            staged: Staged::default(),
        }))
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn events_for(
        &self,
        user: &UserId,
        promotion: &PromotionId,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state
            .audit
            .iter()
            .filter(|e| &e.user_id == user && &e.promotion_id == promotion)
            .cloned()
            .collect())
    }
}

/// Writes made through a unit but not yet committed.
#[derive(Debug, Default)]
struct Staged {
    insert: Option<Favorite>,
    delete: bool,
    audit: Vec<AuditEvent>,
}

struct MemoryFavoriteUnit {
    state: OwnedMutexGuard<State>,
    clock: Arc<dyn Clock>,
    pair: Pair,
    staged: Staged,
}

impl MemoryFavoriteUnit {
    fn visible(&self) -> bool {
        if self.staged.insert.is_some() {
            return true;
        }
        !self.staged.delete && self.state.favorites.contains_key(&self.pair)
    }
}

#[async_trait]
impl FavoriteUnit for MemoryFavoriteUnit {
    async fn exists(&mut self) -> Result<bool, RepositoryError> {
        self.state.check_available()?;
        Ok(self.visible())
    }

    async fn insert(&mut self) -> Result<InsertOutcome, RepositoryError> {
        self.state.check_available()?;

        if self.state.lost_races.remove(&self.pair) {
            let (user, promotion) = self.pair.clone();
            let winner = Favorite {
                id: FavoriteId::generate(),
                user_id: user,
                promotion_id: promotion,
                created_at: self.clock.now(),
            };
            self.state.favorites.insert(self.pair.clone(), winner);
            self.staged.delete = false;
            return Ok(InsertOutcome::Duplicate);
        }

        if self.visible() {
            return Ok(InsertOutcome::Duplicate);
        }

        let (user, promotion) = self.pair.clone();
        self.staged.delete = false;
        self.staged.insert = Some(Favorite {
            id: FavoriteId::generate(),
            user_id: user,
            promotion_id: promotion,
            created_at: self.clock.now(),
        });
        Ok(InsertOutcome::Inserted)
    }

    async fn delete(&mut self) -> Result<u64, RepositoryError> {
        self.state.check_available()?;

        if !self.visible() {
            return Ok(0);
        }
        self.staged.insert = None;
        self.staged.delete = self.state.favorites.contains_key(&self.pair);
        Ok(1)
    }

    async fn append_audit(&mut self, action: FavoriteAction) -> Result<(), RepositoryError> {
        self.state.check_available()?;

        if let Some(delay) = self.state.audit_delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_audit {
            return Err(RepositoryError::Database(sqlx::Error::Protocol(
                "audit append failed".to_string(),
            )));
        }

        let (user, promotion) = self.pair.clone();
        self.staged.audit.push(AuditEvent {
            id: AuditEventId::generate(),
            user_id: user,
            promotion_id: promotion,
            action,
            created_at: self.clock.now(),
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self {
            mut state,
            pair,
            staged,
            ..
        } = *self;
        state.check_available()?;

        if staged.delete {
            state.favorites.remove(&pair);
        }
        if let Some(favorite) = staged.insert {
            state.favorites.insert(pair, favorite);
        }
        state.audit.extend(staged.audit);
        Ok(())
    }
}
