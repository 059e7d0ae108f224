//! Profile and order history.

use crafted_roots_core::{Order, OrderHistory, UserProfile};
use serde::Deserialize;
use tracing::instrument;

use crate::client::{ApiClient, RequestOptions, json_or_error};
use crate::error::ClientError;

const PROFILE_PATH: &str = "api/profile/";
const ORDERS_PATH: &str = "api/orders/";

/// The orders endpoint wraps its list; older deployments return it bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrdersResponse {
    Wrapped { orders: Vec<Order> },
    Bare(Vec<Order>),
}

impl OrdersResponse {
    fn into_orders(self) -> Vec<Order> {
        match self {
            Self::Wrapped { orders } | Self::Bare(orders) => orders,
        }
    }
}

/// Everything the account page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOverview {
    pub profile: UserProfile,
    pub orders: OrderHistory,
}

/// Read-only access to the logged-in user's account.
#[derive(Debug, Clone)]
pub struct ProfileService {
    client: ApiClient,
}

impl ProfileService {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns `ClientError::Api` if the server refuses.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<UserProfile, ClientError> {
        let response = self
            .client
            .request_path(PROFILE_PATH, RequestOptions::get())
            .await?;
        json_or_error(response, "Failed to load profile").await
    }

    /// Order history, split into current and past orders.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the server refuses.
    #[instrument(skip(self))]
    pub async fn fetch_orders(&self) -> Result<OrderHistory, ClientError> {
        let response = self
            .client
            .request_path(ORDERS_PATH, RequestOptions::get())
            .await?;
        let body: OrdersResponse = json_or_error(response, "Failed to load orders").await?;
        let history = OrderHistory::partition(body.into_orders());
        tracing::debug!(
            current = history.current.len(),
            past = history.past.len(),
            "Orders loaded"
        );
        Ok(history)
    }

    /// Profile and orders, fetched concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first error of either fetch.
    pub async fn load_overview(&self) -> Result<ProfileOverview, ClientError> {
        let (profile, orders) = tokio::try_join!(self.fetch_profile(), self.fetch_orders())?;
        Ok(ProfileOverview { profile, orders })
    }
}
