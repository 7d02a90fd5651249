//! Store API library.
//!
//! This crate provides the JSON storefront (catalog, cart, checkout, login)
//! as a library, allowing it to be tested and reused by the binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
