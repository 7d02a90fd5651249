//! Core types for the store API.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod status;
pub mod username;

pub use id::*;
pub use status::{TransactionStatus, TransactionStatusError};
pub use username::{Username, UsernameError};
