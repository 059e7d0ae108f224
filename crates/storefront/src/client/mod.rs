//! Authenticated client for the Crafted Roots REST backend.
//!
//! Every call goes through [`ApiClient::request`], which attaches the stored
//! access token and, when the backend answers `401 Unauthorized`, refreshes
//! the token once and retries once.
//!
//! # Example
//!
//! ```rust,ignore
//! use crafted_roots_storefront::client::{ApiClient, RequestOptions};
//!
//! let client = ApiClient::new(&config, session, events)?;
//! let url = client.endpoint("api/sync-cart-wishlist/")?;
//! let response = client.request(url, RequestOptions::get()).await?;
//! if response.status().is_success() {
//!     // ...
//! }
//! ```

mod request;

pub use request::RequestOptions;

use std::sync::Arc;

use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::instrument;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError};
use crate::events::{EventBus, StorefrontEvent};
use crate::session::Session;

pub(crate) use request::bearer;

/// Token refresh endpoint, relative to the API base.
pub const TOKEN_REFRESH_PATH: &str = "api/token/refresh/";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// API Client
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client that keeps the session's access token fresh.
///
/// Cheap to clone; clones share the connection pool, the session and the
/// refresh lock.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    api_base: Url,
    login_route: String,
    session: Session,
    events: EventBus,
    /// Serialises token refreshes across concurrent requests.
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_base", &self.inner.api_base.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        session: Session,
        events: EventBus,
    ) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http: builder.build()?,
                api_base: config.api_base.clone(),
                login_route: config.login_route.clone(),
                session,
                events,
                refresh_lock: Mutex::new(()),
            }),
        })
    }

    #[must_use]
    pub fn api_base(&self) -> &Url {
        &self.inner.api_base
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// The underlying HTTP client, for calls that must not carry the
    /// session's token (login, registration, public listings).
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Resolve an endpoint path (e.g. `"api/cart/"`) against the API base.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Url` if the path cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.api_base.join(path)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authenticated Requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a request with the stored access token.
    ///
    /// Non-success statuses are returned as responses, never as errors. On
    /// `401` the token is refreshed and the request sent once more with the
    /// new token; that second response is returned whatever its status. If
    /// no new token can be obtained the original `401` is returned.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` on transport failure (never retried) and
    /// `ClientError::Session` if the session store fails.
    #[instrument(skip(self, options), fields(method = %options.method, url = %url))]
    pub async fn request(
        &self,
        url: Url,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        let token = self.inner.session.access_token().await?;
        let response = self.send(&url, &options, token.as_ref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("Request unauthorized, attempting token refresh");
        let Some(fresh) = self.recover_from_unauthorized(token.as_ref()).await? else {
            return Ok(response);
        };
        drop(response);

        tracing::debug!("Retrying request with refreshed token");
        self.send(&url, &options, Some(&fresh)).await
    }

    /// [`request`](Self::request) against an endpoint path.
    ///
    /// # Errors
    ///
    /// As for [`request`](Self::request), plus `ClientError::Url`.
    pub async fn request_path(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        let url = self.endpoint(path)?;
        self.request(url, options).await
    }

    async fn send(
        &self,
        url: &Url,
        options: &RequestOptions,
        token: Option<&SecretString>,
    ) -> Result<Response, ClientError> {
        let mut builder = self
            .inner
            .http
            .request(options.method.clone(), url.clone())
            .headers(options.merged_headers(token));

        if let Some(body) = &options.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        Ok(builder.send().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Token Refresh
    // ─────────────────────────────────────────────────────────────────────────

    /// Obtain a usable token after `rejected` was refused.
    ///
    /// If another task refreshed while this one waited for the lock, the
    /// stored token already differs from `rejected` and is reused without a
    /// second refresh call.
    async fn recover_from_unauthorized(
        &self,
        rejected: Option<&SecretString>,
    ) -> Result<Option<SecretString>, ClientError> {
        let _guard = self.inner.refresh_lock.lock().await;

        if let Some(current) = self.inner.session.access_token().await? {
            let changed =
                rejected.is_none_or(|rejected| rejected.expose_secret() != current.expose_secret());
            if changed {
                tracing::debug!("Access token was refreshed concurrently, reusing it");
                return Ok(Some(current));
            }
        }

        self.refresh_locked().await
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Returns `Ok(None)` without any network call when no refresh token is
    /// stored. If the backend refuses the refresh (or cannot be reached) the
    /// session is cleared, [`StorefrontEvent::LoginRequired`] is published
    /// and `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Session` if the session store fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Option<SecretString>, ClientError> {
        let _guard = self.inner.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Option<SecretString>, ClientError> {
        let Some(refresh_token) = self.inner.session.refresh_token().await? else {
            tracing::debug!("No refresh token stored, skipping refresh");
            return Ok(None);
        };

        match self.request_access_token(&refresh_token).await {
            Ok(access) => {
                self.inner.session.set_access_token(&access).await?;
                tracing::info!("Access token refreshed");
                Ok(Some(SecretString::from(access)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, ending session");
                self.end_session().await?;
                Ok(None)
            }
        }
    }

    async fn request_access_token(
        &self,
        refresh_token: &SecretString,
    ) -> Result<String, ClientError> {
        let url = self.endpoint(TOKEN_REFRESH_PATH)?;
        let response = self
            .inner
            .http
            .post(url)
            .json(&serde_json::json!({ "refresh": refresh_token.expose_secret() }))
            .send()
            .await?;

        let body: RefreshResponse = json_or_error(response, "Token refresh failed").await?;
        Ok(body.access)
    }

    /// Forget the session and tell listeners the user must log in again.
    async fn end_session(&self) -> Result<(), ClientError> {
        let cleared = self.inner.session.clear().await;

        self.inner.events.publish(StorefrontEvent::LoginRequired {
            redirect_to: self.inner.login_route.clone(),
        });
        self.inner
            .events
            .publish(StorefrontEvent::AuthChanged { identity: None });

        cleared.map_err(ClientError::from)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Decode a success body as JSON, or turn an error status into `ApiError`.
///
/// # Errors
///
/// Returns `ClientError::Api` for non-success statuses, `ClientError::Decode`
/// if a success body has the wrong shape and `ClientError::Http` if the body
/// cannot be read.
pub async fn json_or_error<T: DeserializeOwned>(
    response: Response,
    fallback: &str,
) -> Result<T, ClientError> {
    let response = ensure_success(response, fallback).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pass a success response through, or turn an error status into `ApiError`.
///
/// # Errors
///
/// Returns `ClientError::Api` for non-success statuses.
pub async fn ensure_success(response: Response, fallback: &str) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(response, fallback).await.into())
    }
}
