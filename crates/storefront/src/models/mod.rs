//! Domain models for the store.
//!
//! These types are validated domain objects separate from database row
//! types (see `db::store`). Response-facing models derive `Serialize` with
//! the field names clients already consume.

pub mod cart;
pub mod member;
pub mod product;
pub mod transaction;

pub use cart::{CartItem, NewCartItem};
pub use member::{LoginResponse, Member};
pub use product::Product;
pub use transaction::{CheckoutRequest, NewTransaction, Transaction};
