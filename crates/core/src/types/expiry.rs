//! Expiry arithmetic and the injectable clock.
//!
//! "Now" is always supplied by a [`Clock`] so callers (and tests) decide what
//! the current instant is. Countdown values use exact elapsed time, not
//! calendar days: a promotion expiring in thirty minutes is one day away.

use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Source of the current instant.
pub trait Clock: Debug + Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant, movable by hand.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock frozen at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whole days until `expires_at`, rounded up.
///
/// Returns `None` when the promotion never expires. Otherwise returns
/// `ceil((expires_at - now) / 1 day)` over the exact remaining time, so
/// anything expiring later today (even a microsecond from now) reports `1`,
/// an expiry exactly at `now` reports `0`, and past expiries report zero or a
/// negative count.
#[must_use]
pub fn days_until_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    let remaining = expires_at? - now;
    // num_days truncates toward zero, which is already the ceiling for
    // negative values; only a positive remainder needs rounding up.
    let days = remaining.num_days();
    if remaining > Duration::days(days) {
        Some(days + 1)
    } else {
        Some(days)
    }
}

/// Whether a promotion has expired as of `now`.
///
/// An expiry exactly equal to `now` counts as expired; no expiry never does.
#[must_use]
pub fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| at <= now)
}
