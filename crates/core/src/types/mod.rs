//! Core types for Crafted Roots.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod credential;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod profile;
pub mod status;

pub use cart::{CartLineItem, CartSnapshot, CartTotals, GIFT_WRAP_FEE, Product};
pub use credential::{CredentialPair, SessionIdentity};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderHistory, OrderItem};
pub use price::Price;
pub use profile::UserProfile;
pub use status::*;
