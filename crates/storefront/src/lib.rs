//! Crafted Roots storefront client library.
//!
//! Talks to the Crafted Roots REST backend on behalf of a logged-in user:
//! an [`ApiClient`](client::ApiClient) that keeps the access token fresh,
//! pluggable [session storage](session), typed [events] and the services
//! built on top of them.
//!
//! ```rust,ignore
//! use crafted_roots_storefront::{ClientConfig, Storefront};
//!
//! let storefront = Storefront::with_session_file(ClientConfig::from_env()?).await?;
//! storefront.auth().login("meera", &password).await?;
//! let items = storefront.cart().fetch().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod services;
pub mod session;
pub mod state;

pub use client::{ApiClient, RequestOptions};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ClientError};
pub use events::{EventBus, StorefrontEvent};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionKey, SessionStore};
pub use state::Storefront;
