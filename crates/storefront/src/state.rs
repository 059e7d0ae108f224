//! Storefront handle shared by a whole application.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::EventBus;
use crate::services::{AuthService, CartService, CatalogService, ProfileService};
use crate::session::{FileSessionStore, Session};

/// Client, session, event bus and services wired together.
///
/// This struct is cheaply cloneable via `Arc`; clones share the session,
/// the local cart and the event bus.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    client: ApiClient,
    auth: AuthService,
    cart: CartService,
    profile: ProfileService,
    catalog: CatalogService,
}

impl Storefront {
    /// Wire up a storefront over an existing session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, session: Session) -> Result<Self, ClientError> {
        let client = ApiClient::new(&config, session, EventBus::new())?;

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                auth: AuthService::new(client.clone()),
                cart: CartService::new(client.clone()),
                profile: ProfileService::new(client.clone()),
                catalog: CatalogService::new(client.clone()),
                client,
                config,
            }),
        })
    }

    /// Wire up a storefront whose session lives in `config.session_file`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Session` if the session file cannot be read.
    pub async fn with_session_file(config: ClientConfig) -> Result<Self, ClientError> {
        let store = FileSessionStore::open(&config.session_file).await?;
        Self::new(config, Session::new(Arc::new(store)))
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        self.inner.client.session()
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        self.inner.client.events()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn profile(&self) -> &ProfileService {
        &self.inner.profile
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api_base", &self.inner.config.api_base.as_str())
            .finish_non_exhaustive()
    }
}
