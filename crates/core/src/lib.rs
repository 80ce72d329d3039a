//! Dealbook Core - Shared domain types.
//!
//! This crate provides the types used across all Dealbook components:
//! - `api` - Promotion catalog and favorites service
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. The clock is a trait so callers decide what "now" means.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, rewards, audit actions and expiry arithmetic

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
