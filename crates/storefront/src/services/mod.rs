//! Business logic services for the store.
//!
//! # Services
//!
//! - `store` - Catalog, cart, checkout and login over a `StoreRepository`
//! - `auth` - Password verification and session tokens

pub mod auth;
mod error;
mod store;

pub use error::ServiceError;
pub use store::StoreService;
