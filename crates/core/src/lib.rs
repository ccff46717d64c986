//! Granary Core - Shared types library.
//!
//! This crate provides common types used across all Granary components:
//! - `server` - REST API for the Telegram mini-app plus the bot poller
//! - `cli` - Command-line tools for migrations and allowlist management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. Role checks and access-request transitions live here so the
//! rules are shared by the API, the bot and the CLI.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, phone numbers, roles and request statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
