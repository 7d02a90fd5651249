//! Shopping cart types.

use serde::Serialize;

use store_core::{CartId, MemberId, ProductId};

/// A cart row as returned by `cart/view`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub id: CartId,
    pub member_id: MemberId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub is_active: bool,
}

/// Input for adding a product to a member's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCartItem {
    pub member_id: MemberId,
    pub product_id: ProductId,
    pub quantity: i32,
}
