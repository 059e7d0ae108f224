//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! cr-cli cart list
//! cr-cli cart add PRD-8F3K2Q -q 2
//! cr-cli cart set PRD-8F3K2Q 3
//! cr-cli cart remove PRD-8F3K2Q
//! cr-cli cart total --gift-wrap
//! ```

use crafted_roots_core::ProductId;
use crafted_roots_storefront::{ClientError, Storefront};

pub async fn list(storefront: &Storefront) -> Result<(), ClientError> {
    let items = storefront.cart().fetch().await?;
    if items.is_empty() {
        tracing::info!("Your cart is empty");
        return Ok(());
    }

    for item in &items {
        tracing::info!(
            "{} x{}  {}  ({})",
            item.product.title,
            item.quantity,
            item.line_total(),
            item.product.id
        );
    }
    Ok(())
}

pub async fn count(storefront: &Storefront) -> Result<(), ClientError> {
    let count = storefront.cart().count().await?;
    tracing::info!("{count} item(s) in cart");
    Ok(())
}

pub async fn add(
    storefront: &Storefront,
    product_id: &str,
    quantity: u32,
) -> Result<(), ClientError> {
    storefront
        .cart()
        .add(&ProductId::new(product_id), quantity)
        .await?;
    tracing::info!("Added {quantity} x {product_id} to cart");
    Ok(())
}

pub async fn set(
    storefront: &Storefront,
    product_id: &str,
    quantity: u32,
) -> Result<(), ClientError> {
    storefront
        .cart()
        .update_quantity(&ProductId::new(product_id), quantity)
        .await?;
    tracing::info!("Set {product_id} to {quantity}");
    Ok(())
}

pub async fn remove(storefront: &Storefront, product_id: &str) -> Result<(), ClientError> {
    storefront.cart().remove(&ProductId::new(product_id)).await?;
    tracing::info!("Removed {product_id} from cart");
    Ok(())
}

pub async fn total(storefront: &Storefront, gift_wrap: bool) -> Result<(), ClientError> {
    storefront.cart().fetch().await?;
    let totals = storefront.cart().totals(gift_wrap).await;

    tracing::info!("Subtotal:  {}", totals.subtotal);
    if gift_wrap {
        tracing::info!("Gift wrap: {}", totals.gift_wrap);
    }
    tracing::info!("Total:     {}", totals.total);
    Ok(())
}
