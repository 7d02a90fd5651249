//! Checkout transaction types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use store_core::{MemberId, ProductId, TransactionId, TransactionStatus};

/// Checkout input as sent by clients.
///
/// The channel fields are opaque strings passed through to the stored row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub member_id: MemberId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub trx_code: String,
    pub channel_id: String,
    pub channel_ref_no: String,
    pub channel_time: String,
    pub channel_date: String,
}

/// A transaction row about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub member_id: MemberId,
    pub product_id: ProductId,
    pub trx_code: String,
    pub channel_id: String,
    pub channel_ref_no: String,
    pub channel_time: String,
    pub channel_date: String,
    pub amount: Decimal,
    pub amount_fee: Decimal,
    pub status: TransactionStatus,
    pub quantity: i32,
}

impl NewTransaction {
    /// Build a pending record from a request. Amount and status are filled
    /// in once the product has been priced.
    #[must_use]
    pub fn from_request(request: &CheckoutRequest) -> Self {
        Self {
            member_id: request.member_id,
            product_id: request.product_id,
            trx_code: request.trx_code.clone(),
            channel_id: request.channel_id.clone(),
            channel_ref_no: request.channel_ref_no.clone(),
            channel_time: request.channel_time.clone(),
            channel_date: request.channel_date.clone(),
            amount: Decimal::ZERO,
            amount_fee: Decimal::ZERO,
            status: TransactionStatus::Failed,
            quantity: request.quantity,
        }
    }
}

/// A persisted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub member_id: MemberId,
    pub product_id: ProductId,
    pub trx_code: String,
    pub channel_id: String,
    pub channel_ref_no: String,
    pub channel_time: String,
    pub channel_date: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_fee: Decimal,
    pub status: TransactionStatus,
    pub quantity: i32,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}
