//! Core types for Dealbook.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod action;
pub mod expiry;
pub mod id;
pub mod reward;

pub use action::FavoriteAction;
pub use expiry::{Clock, FixedClock, SystemClock, days_until_expiry, is_expired};
pub use id::*;
pub use reward::{Reward, RewardCurrency};
