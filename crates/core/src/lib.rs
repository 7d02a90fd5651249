//! Store Core - Shared types library.
//!
//! This crate provides the types shared by the store API components:
//! - `storefront` - The JSON API serving web and mobile clients
//! - `integration-tests` - Database-backed tests for the storefront repository
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, usernames, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
