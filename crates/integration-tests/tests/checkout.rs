//! Checkout, cart and login against `PostgreSQL`.
//!
//! Requires `DATABASE_URL` pointing at a server where test databases can be
//! created. Run with: `cargo test -p store-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;

use store_core::{MemberId, TransactionStatus, Username};
use store_integration_tests::{seed_member, seed_product, service, stock};
use store_storefront::db::{PgStoreRepository, StoreRepository};
use store_storefront::models::{CheckoutRequest, NewCartItem};
use store_storefront::services::ServiceError;

fn checkout(member_id: MemberId, product_id: store_core::ProductId, quantity: i32) -> CheckoutRequest {
    CheckoutRequest {
        member_id,
        product_id,
        quantity,
        trx_code: "TRX-1".to_string(),
        channel_id: "MOBILE".to_string(),
        ..CheckoutRequest::default()
    }
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_checkout_success_is_atomic(pool: PgPool) {
    let product = seed_product(&pool, "Phone", "electronics", Decimal::new(1_500_050, 2), 10)
        .await
        .unwrap();
    let member = MemberId::new(7);
    let service = service(pool.clone());

    service
        .add_to_cart(&NewCartItem {
            member_id: member,
            product_id: product,
            quantity: 3,
        })
        .await
        .unwrap();
    service
        .create_transaction(&checkout(member, product, 3))
        .await
        .unwrap();

    assert_eq!(stock(&pool, product).await.unwrap(), 7);
    assert!(service.view_cart(member).await.unwrap().is_empty());

    let repo = PgStoreRepository::new(pool);
    let transactions = repo.list_transactions(member).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].status, TransactionStatus::Success);
    assert_eq!(transactions[0].amount, Decimal::new(4_500_150, 2));
    assert_eq!(transactions[0].amount_fee, Decimal::ZERO);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_insufficient_stock_writes_one_failed_row(pool: PgPool) {
    let product = seed_product(&pool, "Phone", "electronics", Decimal::new(100, 0), 2)
        .await
        .unwrap();
    let member = MemberId::new(7);
    let service = service(pool.clone());
    service
        .add_to_cart(&NewCartItem {
            member_id: member,
            product_id: product,
            quantity: 5,
        })
        .await
        .unwrap();

    let err = service
        .create_transaction(&checkout(member, product, 5))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::InsufficientStock { .. }));
    assert_eq!(stock(&pool, product).await.unwrap(), 2);
    assert_eq!(service.view_cart(member).await.unwrap().len(), 1);

    let transactions = PgStoreRepository::new(pool)
        .list_transactions(member)
        .await
        .unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].status, TransactionStatus::Failed);
}

fn long_channel_checkout(member_id: MemberId, product_id: store_core::ProductId, quantity: i32) -> CheckoutRequest {
    CheckoutRequest {
        trx_code: format!("TRX-{}", "9".repeat(150)),
        channel_ref_no: "REF-".repeat(40),
        channel_time: "2026-10-17T10:00:00.000+07:00".to_string(),
        channel_date: "Saturday, 17 October 2026".to_string(),
        ..checkout(member_id, product_id, quantity)
    }
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_long_channel_fields_are_stored(pool: PgPool) {
    let product = seed_product(&pool, "Phone", "electronics", Decimal::new(100, 0), 3)
        .await
        .unwrap();
    let member = MemberId::new(7);
    let service = service(pool.clone());

    service
        .create_transaction(&long_channel_checkout(member, product, 1))
        .await
        .unwrap();
    let err = service
        .create_transaction(&long_channel_checkout(member, product, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock { .. }));
    assert_eq!(stock(&pool, product).await.unwrap(), 2);

    let mut transactions = PgStoreRepository::new(pool)
        .list_transactions(member)
        .await
        .unwrap();
    transactions.sort_by_key(|t| t.id);
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].status, TransactionStatus::Success);
    assert_eq!(transactions[1].status, TransactionStatus::Failed);
    assert_eq!(transactions[1].channel_time, "2026-10-17T10:00:00.000+07:00");
    assert_eq!(transactions[1].channel_ref_no.len(), 160);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_checkouts_never_oversell(pool: PgPool) {
    let product = seed_product(&pool, "Phone", "electronics", Decimal::new(100, 0), 1)
        .await
        .unwrap();
    let service = service(pool.clone());

    let first = service.clone();
    let second = service.clone();
    let first_request = checkout(MemberId::new(1), product, 1);
    let second_request = checkout(MemberId::new(2), product, 1);
    let (a, b) = tokio::join!(
        first.create_transaction(&first_request),
        second.create_transaction(&second_request),
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    assert_eq!(stock(&pool, product).await.unwrap(), 0);

    let statuses: Vec<String> = sqlx::query_scalar("SELECT status FROM store.transaction ORDER BY status")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(statuses, vec!["failed".to_string(), "success".to_string()]);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_unknown_product_stores_nothing(pool: PgPool) {
    let service = service(pool.clone());

    let err = service
        .create_transaction(&checkout(MemberId::new(7), store_core::ProductId::new(999), 1))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound("Product")));
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM store.transaction")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_list_products_by_category(pool: PgPool) {
    seed_product(&pool, "Phone", "electronics", Decimal::new(250_000, 2), 5)
        .await
        .unwrap();
    seed_product(&pool, "Novel", "books", Decimal::new(9_900, 2), 20)
        .await
        .unwrap();
    let service = service(pool);

    assert_eq!(service.list_products(None).await.unwrap().len(), 2);

    let electronics = service.list_products(Some("electronics")).await.unwrap();
    assert_eq!(electronics.len(), 1);
    assert_eq!(electronics[0].name, "Phone");
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_delete_cart_twice(pool: PgPool) {
    let product = seed_product(&pool, "Phone", "electronics", Decimal::new(100, 0), 5)
        .await
        .unwrap();
    let member = MemberId::new(7);
    let service = service(pool);
    service
        .add_to_cart(&NewCartItem {
            member_id: member,
            product_id: product,
            quantity: 1,
        })
        .await
        .unwrap();

    service.delete_product_in_cart(member, product).await.unwrap();
    service.delete_product_in_cart(member, product).await.unwrap();

    assert!(service.view_cart(member).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "requires PostgreSQL"]
async fn test_login_with_bcrypt_member(pool: PgPool) {
    let member = seed_member(&pool, "dewi", "hunter22", "s4lt").await.unwrap();
    let service = service(pool);
    let username = Username::parse("dewi").unwrap();

    let session = service.login(&username, "hunter22").await.unwrap();
    assert_eq!(session.id_user, member);
    assert!(!session.token.is_empty());

    let err = service.login(&username, "wrong").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));

    let unknown = Username::parse("nobody").unwrap();
    let err = service.login(&unknown, "hunter22").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound("Member")));
}
