//! `PostgreSQL` implementation of [`StoreRepository`].
//!
//! Queries are checked at runtime (`query_as` + `FromRow` row types) so the
//! crate builds without a live database. Row types are converted into domain
//! models, validating anything the database could hold that the domain
//! rejects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;

use store_core::{
    CartId, MemberId, ProductId, TransactionId, TransactionStatus, Username,
};

use super::{RepositoryError, StoreRepository};
use crate::models::{CartItem, Member, NewCartItem, NewTransaction, Product, Transaction};

const INSERT_TRANSACTION: &str = r"
    INSERT INTO store.transaction (
        member_id, product_id, trx_code, channel_id, channel_ref_no,
        channel_time, channel_date, amount, amount_fee, status, quantity
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
";

/// Repository backed by the `store` schema.
#[derive(Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    /// Create a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    category: String,
    price: Decimal,
    stock: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            category: row.category,
            price: row.price,
            stock: row.stock,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: i32,
    member_id: i32,
    product_id: i32,
    quantity: i32,
    is_active: bool,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            member_id: MemberId::new(row.member_id),
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            is_active: row.is_active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: i32,
    channel_id: String,
    username: String,
    credential: String,
    salt: String,
    created_date: DateTime<Utc>,
}

impl TryFrom<MemberRow> for Member {
    type Error = RepositoryError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;

        Ok(Self {
            id: MemberId::new(row.id),
            channel_id: row.channel_id,
            username,
            credential: SecretString::from(row.credential),
            salt: row.salt,
            created_date: row.created_date,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: i32,
    member_id: i32,
    product_id: i32,
    trx_code: String,
    channel_id: String,
    channel_ref_no: String,
    channel_time: String,
    channel_date: String,
    amount: Decimal,
    amount_fee: Decimal,
    status: String,
    quantity: i32,
    created_date: DateTime<Utc>,
    updated_date: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepositoryError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<TransactionStatus>()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: TransactionId::new(row.id),
            member_id: MemberId::new(row.member_id),
            product_id: ProductId::new(row.product_id),
            trx_code: row.trx_code,
            channel_id: row.channel_id,
            channel_ref_no: row.channel_ref_no,
            channel_time: row.channel_time,
            channel_date: row.channel_date,
            amount: row.amount,
            amount_fee: row.amount_fee,
            status,
            quantity: row.quantity,
            created_date: row.created_date,
            updated_date: row.updated_date,
        })
    }
}

/// Bind a transaction's columns in `INSERT_TRANSACTION` order.
fn bind_transaction<'q>(
    transaction: &'q NewTransaction,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(INSERT_TRANSACTION)
        .bind(transaction.member_id)
        .bind(transaction.product_id)
        .bind(&transaction.trx_code)
        .bind(&transaction.channel_id)
        .bind(&transaction.channel_ref_no)
        .bind(&transaction.channel_time)
        .bind(&transaction.channel_date)
        .bind(transaction.amount)
        .bind(transaction.amount_fee)
        .bind(transaction.status.as_str())
        .bind(transaction.quantity)
}

#[async_trait]
impl StoreRepository for PgStoreRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_products(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, category, price, stock
            FROM store.product
            WHERE ($1::text IS NULL OR category = $1)
            ORDER BY id
            ",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, category, price, stock FROM store.product WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn create_cart(&self, item: &NewCartItem) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO store.cart (member_id, product_id, quantity, is_active)
            VALUES ($1, $2, $3, TRUE)
            ",
        )
        .bind(item.member_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_cart(&self, member_id: MemberId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, member_id, product_id, quantity, is_active
            FROM store.cart
            WHERE member_id = $1 AND is_active
            ORDER BY id
            ",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn delete_product_in_cart(
        &self,
        member_id: MemberId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE store.cart SET is_active = FALSE WHERE member_id = $1 AND product_id = $2",
        )
        .bind(member_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<(), RepositoryError> {
        // Rolled back on drop; every early return below leaves no trace.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE store.cart SET is_active = FALSE
            WHERE member_id = $1 AND product_id = $2 AND is_active
            ",
        )
        .bind(transaction.member_id)
        .bind(transaction.product_id)
        .execute(&mut *tx)
        .await?;

        let deducted = sqlx::query(
            "UPDATE store.product SET stock = stock - $1 WHERE id = $2 AND stock >= $1",
        )
        .bind(transaction.quantity)
        .bind(transaction.product_id)
        .execute(&mut *tx)
        .await?;

        if deducted.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "product {} has fewer than {} in stock",
                transaction.product_id, transaction.quantity
            )));
        }

        bind_transaction(transaction).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_failed_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<(), RepositoryError> {
        bind_transaction(transaction).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_member_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Member>, RepositoryError> {
        let row = sqlx::query_as::<_, MemberRow>(
            r"
            SELECT id, channel_id, username, credential, salt, created_date
            FROM store.member
            WHERE username = $1
            ",
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Member::try_from).transpose()
    }

    async fn list_transactions(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r"
            SELECT id, member_id, product_id, trx_code, channel_id, channel_ref_no,
                   channel_time, channel_date, amount, amount_fee, status, quantity,
                   created_date, updated_date
            FROM store.transaction
            WHERE member_id = $1
            ORDER BY created_date DESC, id DESC
            ",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }
}
