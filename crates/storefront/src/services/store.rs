//! Store service: catalog, cart, checkout and login.

use std::sync::Arc;

use axum::http::StatusCode;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use tracing::instrument;

use store_core::{MemberId, ProductId, TransactionStatus, Username};

use super::ServiceError;
use super::auth::{PasswordVerifier, SessionClaims, TokenIssuer};
use crate::db::{RepositoryError, StoreRepository};
use crate::models::{
    CartItem, CheckoutRequest, LoginResponse, NewCartItem, NewTransaction, Product,
};

/// Business rules over a [`StoreRepository`].
///
/// Owns the "stock never goes negative" rule and the failed-transaction
/// audit: every checkout attempt that gets past the product lookup writes
/// exactly one transaction row.
#[derive(Clone)]
pub struct StoreService {
    repo: Arc<dyn StoreRepository>,
    passwords: Arc<dyn PasswordVerifier>,
    tokens: Arc<dyn TokenIssuer>,
    insufficient_stock_status: StatusCode,
}

impl StoreService {
    /// Create a service. Insufficient stock is reported as 409 Conflict
    /// unless changed with [`Self::with_insufficient_stock_status`].
    #[must_use]
    pub fn new(
        repo: Arc<dyn StoreRepository>,
        passwords: Arc<dyn PasswordVerifier>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            repo,
            passwords,
            tokens,
            insufficient_stock_status: StatusCode::CONFLICT,
        }
    }

    /// Status used for insufficient stock (legacy clients expect 200).
    #[must_use]
    pub const fn with_insufficient_stock_status(mut self, status: StatusCode) -> Self {
        self.insufficient_stock_status = status;
        self
    }

    /// The repository this service writes through.
    #[must_use]
    pub fn repository(&self) -> &dyn StoreRepository {
        self.repo.as_ref()
    }

    /// Products, optionally filtered by exact category.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_products(&self, category: Option<&str>) -> Result<Vec<Product>, ServiceError> {
        Ok(self.repo.list_products(category).await?)
    }

    /// Add a product to a member's cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidQuantity` for quantities below one and
    /// `ServiceError::Repository` if the insert fails.
    pub async fn add_to_cart(&self, item: &NewCartItem) -> Result<(), ServiceError> {
        if item.quantity < 1 {
            return Err(ServiceError::InvalidQuantity);
        }
        Ok(self.repo.create_cart(item).await?)
    }

    /// Active cart rows for a member.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn view_cart(&self, member_id: MemberId) -> Result<Vec<CartItem>, ServiceError> {
        Ok(self.repo.get_cart(member_id).await?)
    }

    /// Remove a product from a member's cart. Removing twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the update fails.
    pub async fn delete_product_in_cart(
        &self,
        member_id: MemberId,
        product_id: ProductId,
    ) -> Result<(), ServiceError> {
        Ok(self
            .repo
            .delete_product_in_cart(member_id, product_id)
            .await?)
    }

    /// Check out `quantity` of a product for a member.
    ///
    /// On success stock is decremented, the member's cart row for the product
    /// is deactivated and a `success` transaction is stored, all in one
    /// database transaction. Any failure after the product lookup stores a
    /// `failed` transaction instead and returns the original error.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if the product does not exist (nothing stored)
    /// - `ServiceError::InsufficientStock` if stock is short
    /// - `ServiceError::Repository` if the checkout write fails
    #[instrument(skip_all, fields(member_id = %request.member_id, product_id = %request.product_id))]
    pub async fn create_transaction(&self, request: &CheckoutRequest) -> Result<(), ServiceError> {
        if request.quantity < 1 {
            return Err(ServiceError::InvalidQuantity);
        }

        let product = self
            .repo
            .get_product(request.product_id)
            .await?
            .ok_or(ServiceError::NotFound("Product"))?;

        let mut record = NewTransaction::from_request(request);

        match self.apply_checkout(&product, &mut record).await {
            Ok(()) => {
                tracing::info!(amount = %record.amount, "Transaction created");
                Ok(())
            }
            Err(err) => {
                record.status = TransactionStatus::Failed;
                if let Err(audit_err) = self.repo.insert_failed_transaction(&record).await {
                    tracing::error!(
                        error = %audit_err,
                        original_error = %err,
                        "Failed to record failed transaction"
                    );
                }
                Err(err)
            }
        }
    }

    async fn apply_checkout(
        &self,
        product: &Product,
        record: &mut NewTransaction,
    ) -> Result<(), ServiceError> {
        if product.remaining_after(record.quantity).is_none() {
            return Err(self.insufficient_stock());
        }

        record.amount = product.price * Decimal::from(record.quantity);
        record.amount_fee = Decimal::ZERO;
        record.status = TransactionStatus::Success;

        match self.repo.create_transaction(record).await {
            Ok(()) => Ok(()),
            // A concurrent checkout took the stock between lookup and write.
            Err(RepositoryError::Conflict(_)) => Err(self.insufficient_stock()),
            Err(e) => Err(e.into()),
        }
    }

    const fn insufficient_stock(&self) -> ServiceError {
        ServiceError::InsufficientStock {
            status: self.insufficient_stock_status,
        }
    }

    /// Check a member's password and issue a session token.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if no member has this username
    /// - `ServiceError::Unauthorized` if the password does not match
    /// - `ServiceError::Auth` / `ServiceError::Token` for unreadable hashes or signing failures
    #[instrument(skip_all, fields(username = %username))]
    pub async fn login(
        &self,
        username: &Username,
        password: &str,
    ) -> Result<LoginResponse, ServiceError> {
        let member = self
            .repo
            .get_member_by_username(username)
            .await?
            .ok_or(ServiceError::NotFound("Member"))?;

        let salted = format!("{password}{}", member.salt);
        if !self
            .passwords
            .verify(&salted, member.credential.expose_secret())?
        {
            return Err(ServiceError::Unauthorized);
        }

        let token = self.tokens.issue(&SessionClaims::for_member(&member))?;

        Ok(LoginResponse {
            id_user: member.id,
            token,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::db::{FailPoint, InMemoryStoreRepository};
    use crate::services::auth::{HashPasswordVerifier, JwtTokenIssuer};

    const SECRET: &str = "k3Y!x9#Qm2@vL7$wR4^tZ8&nB1*pD6%h";

    fn service(repo: &InMemoryStoreRepository) -> StoreService {
        StoreService::new(
            Arc::new(repo.clone()),
            Arc::new(HashPasswordVerifier),
            Arc::new(JwtTokenIssuer::new(&SecretString::from(SECRET))),
        )
    }

    fn request(member_id: MemberId, product_id: ProductId, quantity: i32) -> CheckoutRequest {
        CheckoutRequest {
            member_id,
            product_id,
            quantity,
            trx_code: "TRX-0001".to_string(),
            channel_id: "MOBILE".to_string(),
            ..CheckoutRequest::default()
        }
    }

    async fn seeded() -> (InMemoryStoreRepository, ProductId, MemberId) {
        let repo = InMemoryStoreRepository::new();
        let product = repo
            .insert_product("Rice Cooker", "kitchen", Decimal::new(12_550, 2), 5)
            .await;
        let member = MemberId::new(900);
        repo.create_cart(&NewCartItem {
            member_id: member,
            product_id: product,
            quantity: 2,
        })
        .await
        .unwrap();
        (repo, product, member)
    }

    #[tokio::test]
    async fn test_checkout_success_applies_all_effects() {
        let (repo, product, member) = seeded().await;

        service(&repo)
            .create_transaction(&request(member, product, 2))
            .await
            .unwrap();

        assert_eq!(repo.stock(product).await, Some(3));
        assert!(!repo.cart_rows().await[0].is_active);

        let transactions = repo.transactions().await;
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Success);
        assert_eq!(transactions[0].amount, Decimal::new(25_100, 2));
        assert_eq!(transactions[0].amount_fee, Decimal::ZERO);
        assert_eq!(transactions[0].trx_code, "TRX-0001");
    }

    #[tokio::test]
    async fn test_checkout_insufficient_stock_records_one_failed_row() {
        let (repo, product, member) = seeded().await;

        let err = service(&repo)
            .create_transaction(&request(member, product, 6))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InsufficientStock { .. }));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(repo.stock(product).await, Some(5));
        assert!(repo.cart_rows().await[0].is_active);

        let transactions = repo.transactions().await;
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_checkout_legacy_stock_status() {
        let (repo, product, member) = seeded().await;

        let err = service(&repo)
            .with_insufficient_stock_status(StatusCode::OK)
            .create_transaction(&request(member, product, 50))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::OK);
        assert_eq!(err.to_string(), "Quantity not enough");
    }

    #[tokio::test]
    async fn test_checkout_unknown_product_stores_nothing() {
        let (repo, _, member) = seeded().await;

        let err = service(&repo)
            .create_transaction(&request(member, ProductId::new(404), 1))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Product not found");
        assert!(repo.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_write_failure_records_failed_row() {
        let (repo, product, member) = seeded().await;
        repo.fail_at(FailPoint::CreateTransaction).await;

        let err = service(&repo)
            .create_transaction(&request(member, product, 1))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(repo.stock(product).await, Some(5));
        assert!(repo.cart_rows().await[0].is_active);

        let transactions = repo.transactions().await;
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_checkout_audit_failure_keeps_original_error() {
        let (repo, product, member) = seeded().await;
        repo.fail_at(FailPoint::CreateTransaction).await;
        repo.fail_at(FailPoint::InsertFailedTransaction).await;

        let err = service(&repo)
            .create_transaction(&request(member, product, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Repository(_)));
        assert!(repo.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_rejects_zero_quantity() {
        let (repo, product, member) = seeded().await;

        let err = service(&repo)
            .create_transaction(&request(member, product, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidQuantity));
        assert!(repo.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_product_in_cart_twice() {
        let (repo, product, member) = seeded().await;
        let service = service(&repo);

        service.delete_product_in_cart(member, product).await.unwrap();
        service.delete_product_in_cart(member, product).await.unwrap();

        assert!(!repo.cart_rows().await[0].is_active);
        assert!(service.view_cart(member).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let repo = InMemoryStoreRepository::new();
        let hash = bcrypt::hash("rahasia123NaCl", 4).unwrap();
        let username = Username::parse("budi").unwrap();
        let member = repo.insert_member(username.clone(), &hash, "NaCl").await;

        let response = service(&repo).login(&username, "rahasia123").await.unwrap();

        assert_eq!(response.id_user, member);
        let claims = JwtTokenIssuer::new(&SecretString::from(SECRET))
            .verify(&response.token)
            .unwrap();
        assert_eq!(claims.user_id, member.to_string());
        assert_eq!(claims.username, "budi");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let repo = InMemoryStoreRepository::new();
        let hash = bcrypt::hash("rahasia123NaCl", 4).unwrap();
        let username = Username::parse("budi").unwrap();
        repo.insert_member(username.clone(), &hash, "NaCl").await;

        let err = service(&repo).login(&username, "tebakan").await.unwrap_err();

        assert!(matches!(err, ServiceError::Unauthorized));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_unknown_member() {
        let repo = InMemoryStoreRepository::new();
        let username = Username::parse("nobody").unwrap();

        let err = service(&repo).login(&username, "x").await.unwrap_err();

        assert_eq!(err.to_string(), "Member not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
