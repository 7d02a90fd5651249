//! Product catalog types.

use rust_decimal::Decimal;
use serde::Serialize;

use store_core::ProductId;

/// A catalog product.
///
/// `stock` is only ever changed by a successful checkout and never goes
/// below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    /// Unit price, rendered as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock: i32,
}

impl Product {
    /// Stock left after taking `quantity`, or `None` if there is not enough.
    #[must_use]
    pub fn remaining_after(&self, quantity: i32) -> Option<i32> {
        self.stock.checked_sub(quantity).filter(|left| *left >= 0)
    }
}
