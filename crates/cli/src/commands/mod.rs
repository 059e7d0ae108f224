//! Command implementations.

pub mod account;
pub mod auth;
pub mod cart;
pub mod products;
