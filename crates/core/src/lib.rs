//! Crafted Roots Core - Shared domain types.
//!
//! This crate provides the types exchanged between the storefront client and
//! the Crafted Roots REST backend:
//! - `storefront` - Authenticated API client and services built on these types
//! - `cli` - Command-line front end for the storefront client
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no session storage. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Public IDs, email, prices, statuses, credentials, carts,
//!   orders and profiles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
