//! In-memory [`StoreRepository`] with failure injection.
//!
//! Backs service and route tests without a database. All state sits behind a
//! single `tokio::sync::Mutex`, so `create_transaction` is atomic the same way
//! the `PostgreSQL` transaction is: either every write lands or none does.
//!
//! Individual operations can be made to fail with [`FailPoint`] to exercise
//! error paths (e.g. the checkout write failing after the product lookup).

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tokio::sync::Mutex;

use store_core::{CartId, MemberId, ProductId, TransactionId, Username};

use super::{RepositoryError, StoreRepository};
use crate::models::{CartItem, Member, NewCartItem, NewTransaction, Product, Transaction};

/// Repository operations that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Ping,
    ListProducts,
    GetProduct,
    CreateCart,
    GetCart,
    DeleteProductInCart,
    CreateTransaction,
    InsertFailedTransaction,
    GetMemberByUsername,
}

#[derive(Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    carts: Vec<CartItem>,
    members: Vec<Member>,
    transactions: Vec<Transaction>,
    failures: HashSet<FailPoint>,
    next_id: i32,
}

impl State {
    const fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, point: FailPoint) -> Result<(), RepositoryError> {
        if self.failures.contains(&point) {
            return Err(RepositoryError::Database(sqlx::Error::Protocol(format!(
                "injected failure at {point:?}"
            ))));
        }
        Ok(())
    }

    fn record(&mut self, transaction: &NewTransaction) {
        let now = Utc::now();
        let id = TransactionId::new(self.next_id());
        self.transactions.push(Transaction {
            id,
            member_id: transaction.member_id,
            product_id: transaction.product_id,
            trx_code: transaction.trx_code.clone(),
            channel_id: transaction.channel_id.clone(),
            channel_ref_no: transaction.channel_ref_no.clone(),
            channel_time: transaction.channel_time.clone(),
            channel_date: transaction.channel_date.clone(),
            amount: transaction.amount,
            amount_fee: transaction.amount_fee,
            status: transaction.status,
            quantity: transaction.quantity,
            created_date: now,
            updated_date: now,
        });
    }
}

/// Thread-safe in-memory store. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct InMemoryStoreRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryStoreRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product and return its id.
    pub async fn insert_product(
        &self,
        name: &str,
        category: &str,
        price: Decimal,
        stock: i32,
    ) -> ProductId {
        let mut state = self.state.lock().await;
        let id = ProductId::new(state.next_id());
        state.products.insert(
            id,
            Product {
                id,
                name: name.to_owned(),
                category: category.to_owned(),
                price,
                stock,
            },
        );
        id
    }

    /// Add a member with an already-hashed credential and return its id.
    pub async fn insert_member(&self, username: Username, credential: &str, salt: &str) -> MemberId {
        let mut state = self.state.lock().await;
        let id = MemberId::new(state.next_id());
        state.members.push(Member {
            id,
            channel_id: String::new(),
            username,
            credential: SecretString::from(credential.to_owned()),
            salt: salt.to_owned(),
            created_date: Utc::now(),
        });
        id
    }

    /// Make `point` fail until [`Self::clear_failures`] is called.
    pub async fn fail_at(&self, point: FailPoint) {
        self.state.lock().await.failures.insert(point);
    }

    /// Remove all injected failures.
    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Current stock of a product.
    pub async fn stock(&self, id: ProductId) -> Option<i32> {
        self.state.lock().await.products.get(&id).map(|p| p.stock)
    }

    /// Every cart row, active or not, in insertion order.
    pub async fn cart_rows(&self) -> Vec<CartItem> {
        self.state.lock().await.carts.clone()
    }

    /// Every transaction row in insertion order.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().await.transactions.clone()
    }
}

#[async_trait]
impl StoreRepository for InMemoryStoreRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.state.lock().await.check(FailPoint::Ping)
    }

    async fn list_products(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.lock().await;
        state.check(FailPoint::ListProducts)?;
        Ok(state
            .products
            .values()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let state = self.state.lock().await;
        state.check(FailPoint::GetProduct)?;
        Ok(state.products.get(&id).cloned())
    }

    async fn create_cart(&self, item: &NewCartItem) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.check(FailPoint::CreateCart)?;
        let id = CartId::new(state.next_id());
        state.carts.push(CartItem {
            id,
            member_id: item.member_id,
            product_id: item.product_id,
            quantity: item.quantity,
            is_active: true,
        });
        Ok(())
    }

    async fn get_cart(&self, member_id: MemberId) -> Result<Vec<CartItem>, RepositoryError> {
        let state = self.state.lock().await;
        state.check(FailPoint::GetCart)?;
        Ok(state
            .carts
            .iter()
            .filter(|c| c.member_id == member_id && c.is_active)
            .cloned()
            .collect())
    }

    async fn delete_product_in_cart(
        &self,
        member_id: MemberId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.check(FailPoint::DeleteProductInCart)?;
        state
            .carts
            .iter_mut()
            .filter(|c| c.member_id == member_id && c.product_id == product_id)
            .for_each(|c| c.is_active = false);
        Ok(())
    }

    async fn create_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.check(FailPoint::CreateTransaction)?;

        // Validate everything before the first write so a failure leaves no trace.
        let remaining = state
            .products
            .get(&transaction.product_id)
            .and_then(|p| p.remaining_after(transaction.quantity))
            .ok_or_else(|| {
                RepositoryError::Conflict(format!(
                    "product {} has fewer than {} in stock",
                    transaction.product_id, transaction.quantity
                ))
            })?;

        state
            .carts
            .iter_mut()
            .filter(|c| {
                c.member_id == transaction.member_id
                    && c.product_id == transaction.product_id
                    && c.is_active
            })
            .for_each(|c| c.is_active = false);

        if let Some(product) = state.products.get_mut(&transaction.product_id) {
            product.stock = remaining;
        }

        state.record(transaction);
        Ok(())
    }

    async fn insert_failed_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.check(FailPoint::InsertFailedTransaction)?;
        state.record(transaction);
        Ok(())
    }

    async fn get_member_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Member>, RepositoryError> {
        let state = self.state.lock().await;
        state.check(FailPoint::GetMemberByUsername)?;
        Ok(state
            .members
            .iter()
            .find(|m| &m.username == username)
            .cloned())
    }

    async fn list_transactions(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.member_id == member_id)
            .cloned()
            .collect())
    }
}
