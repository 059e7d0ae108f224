//! Cart service.
//!
//! Mirrors the server-side cart locally so pages can render line items and
//! totals without refetching after every change.

use std::sync::Arc;

use crafted_roots_core::{CartLineItem, CartSnapshot, CartTotals, ProductId};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::client::{ApiClient, RequestOptions, ensure_success, json_or_error};
use crate::error::ClientError;
use crate::events::StorefrontEvent;

const SYNC_PATH: &str = "api/sync-cart-wishlist/";
const CART_PATH: &str = "api/cart/";

#[derive(Debug, Default)]
struct CartState {
    items: Vec<CartLineItem>,
    wishlist: Vec<serde_json::Value>,
}

/// Cart operations for the logged-in user.
///
/// Clones share the same local cart state.
#[derive(Debug, Clone)]
pub struct CartService {
    client: ApiClient,
    state: Arc<RwLock<CartState>>,
}

impl CartService {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(CartState::default())),
        }
    }

    /// Load the cart from the server, replacing the local copy.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the server refuses (including an
    /// unrecoverable `401`).
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<Vec<CartLineItem>, ClientError> {
        let response = self
            .client
            .request_path(SYNC_PATH, RequestOptions::get())
            .await?;
        let snapshot: CartSnapshot = json_or_error(response, "Failed to fetch cart").await?;

        let mut state = self.state.write().await;
        state.items = snapshot.cart;
        state.wishlist = snapshot.wishlist;
        tracing::debug!(items = state.items.len(), "Cart loaded");
        Ok(state.items.clone())
    }

    /// Number of lines in the server-side cart; `0` if the server refuses.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` on transport failure and
    /// `ClientError::Decode` if a success body has the wrong shape.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<usize, ClientError> {
        let response = self
            .client
            .request_path(SYNC_PATH, RequestOptions::get())
            .await?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Cart count unavailable");
            return Ok(0);
        }

        let snapshot: CartSnapshot = serde_json::from_slice(&response.bytes().await?)?;
        Ok(snapshot.cart.len())
    }

    /// Add a product to the cart.
    ///
    /// An existing local line is bumped in place. A product not yet in the
    /// local cart is picked up by reloading the cart from the server; if
    /// that reload fails the add still succeeds and the local cart stays as
    /// it was. Returns the server's response body.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a zero quantity and
    /// `ClientError::Api` if the server refuses.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<serde_json::Value, ClientError> {
        ensure_positive(quantity)?;

        let response = self
            .client
            .request_path(
                CART_PATH,
                RequestOptions::post(json!({
                    "product_id": product_id,
                    "quantity": quantity,
                })),
            )
            .await?;
        let body = json_or_error(response, "Failed to add to cart").await?;

        let bumped = {
            let mut state = self.state.write().await;
            if let Some(item) = find_mut(&mut state.items, product_id) {
                item.quantity = item.quantity.saturating_add(quantity);
                true
            } else {
                false
            }
        };

        if !bumped {
            let reloaded = self.fetch().await;
            if let Err(e) = reloaded {
                tracing::warn!(error = %e, "Added to cart but could not reload it");
            }
        }

        self.client.events().publish(StorefrontEvent::CartUpdated);
        Ok(body)
    }

    /// Set the quantity of a cart line.
    ///
    /// A quantity below 1 is rejected without contacting the server and
    /// leaves the local cart untouched; use [`remove`](Self::remove) instead.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a zero quantity and
    /// `ClientError::Api` if the server refuses.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ClientError> {
        ensure_positive(quantity)?;

        let response = self
            .client
            .request_path(
                CART_PATH,
                RequestOptions::patch(json!({
                    "product_id": product_id,
                    "quantity": quantity,
                })),
            )
            .await?;
        ensure_success(response, "Failed to update cart").await?;

        {
            let mut state = self.state.write().await;
            if let Some(item) = find_mut(&mut state.items, product_id) {
                item.quantity = quantity;
            }
        }

        self.client.events().publish(StorefrontEvent::CartUpdated);
        Ok(())
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the server refuses.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<(), ClientError> {
        let response = self
            .client
            .request_path(
                CART_PATH,
                RequestOptions::delete().with_body(json!({ "product_id": product_id })),
            )
            .await?;
        ensure_success(response, "Failed to remove item").await?;

        self.state
            .write()
            .await
            .items
            .retain(|item| &item.product.id != product_id);

        self.client.events().publish(StorefrontEvent::CartUpdated);
        Ok(())
    }

    /// The cart as last fetched (and locally updated).
    pub async fn items(&self) -> Vec<CartLineItem> {
        self.state.read().await.items.clone()
    }

    /// Wishlist entries from the last fetch.
    pub async fn wishlist(&self) -> Vec<serde_json::Value> {
        self.state.read().await.wishlist.clone()
    }

    /// Totals for the local cart.
    pub async fn totals(&self, gift_wrap: bool) -> CartTotals {
        CartTotals::compute(&self.state.read().await.items, gift_wrap)
    }

    #[cfg(test)]
    async fn replace_items(&self, items: Vec<CartLineItem>) {
        self.state.write().await.items = items;
    }
}

fn ensure_positive(quantity: u32) -> Result<(), ClientError> {
    if quantity < 1 {
        return Err(ClientError::validation("Quantity must be at least 1"));
    }
    Ok(())
}

fn find_mut<'a>(
    items: &'a mut [CartLineItem],
    product_id: &ProductId,
) -> Option<&'a mut CartLineItem> {
    items.iter_mut().find(|item| &item.product.id == product_id)
}
