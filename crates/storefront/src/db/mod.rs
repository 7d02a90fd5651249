//! Database access for the store.
//!
//! # Schema: `store`
//!
//! - `product` - Catalog with price and stock (`CHECK (stock >= 0)`)
//! - `cart` - Per-member cart rows, soft-deleted via `is_active`
//! - `member` - Login accounts (credential hash + salt)
//! - `transaction` - One row per checkout attempt (`success` / `failed`)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and are applied
//! with `sqlx migrate run` or by `#[sqlx::test]` in the integration tests.
//!
//! The repository carries no business rules: stock checks, pricing and the
//! failed-transaction fallback live in [`crate::services`].

pub mod memory;
pub mod store;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use store_core::{MemberId, ProductId, Username};

use crate::models::{CartItem, Member, NewCartItem, NewTransaction, Product, Transaction};

pub use memory::{FailPoint, InMemoryStoreRepository};
pub use store::PgStoreRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A conditional write matched no rows (e.g. stock taken by a concurrent checkout).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Persistence operations used by the store service.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// All products, or only those in `category` when given.
    async fn list_products(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError>;

    /// A single product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert an active cart row.
    async fn create_cart(&self, item: &NewCartItem) -> Result<(), RepositoryError>;

    /// Active cart rows for a member.
    async fn get_cart(&self, member_id: MemberId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Soft-delete the member's cart rows for a product. Idempotent.
    async fn delete_product_in_cart(
        &self,
        member_id: MemberId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError>;

    /// Apply a successful checkout atomically: deactivate the cart row,
    /// decrement stock by `quantity`, insert the transaction.
    ///
    /// Returns `RepositoryError::Conflict` without side effects when the
    /// product no longer has `quantity` in stock.
    async fn create_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<(), RepositoryError>;

    /// Insert an audit row outside any transaction.
    async fn insert_failed_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<(), RepositoryError>;

    /// A member by login name.
    async fn get_member_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Member>, RepositoryError>;

    /// A member's transactions, newest first.
    async fn list_transactions(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<Transaction>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
