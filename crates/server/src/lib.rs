//! Granary inventory backend.
//!
//! One process serves two front ends over the same `PostgreSQL` database:
//!
//! - a REST API under `/api` for the Telegram mini-app, authenticated with
//!   the mini-app's signed init data
//! - a Telegram bot (long polling) for quick stock checks, product entry,
//!   phone-based onboarding and access-request review
//!
//! The crate is a library so the binary, the CLI and the integration tests
//! share the same code.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod telegram;
