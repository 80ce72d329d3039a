//! Dealbook API library.
//!
//! Promotion catalog queries, favorites and the HTTP surface over them. The
//! binary in `main.rs` wires this to `PostgreSQL`, Sentry and a TCP listener;
//! tests drive the same router over a [`db::MemoryStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
