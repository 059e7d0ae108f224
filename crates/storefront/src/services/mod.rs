//! Storefront services built on [`ApiClient`](crate::client::ApiClient).
//!
//! - `auth` - Login, signup, logout, password management
//! - `cart` - Server-side cart with a local mirror
//! - `profile` - Profile and order history
//! - `catalog` - Public product listings

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod profile;

pub use auth::{AuthService, SignupForm};
pub use cart::CartService;
pub use catalog::{CatalogService, ProductQuery};
pub use profile::{ProfileOverview, ProfileService};
