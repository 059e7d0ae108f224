//! Profile and order history commands.

use crafted_roots_core::Order;
use crafted_roots_storefront::{ClientError, Storefront};

pub async fn profile(storefront: &Storefront) -> Result<(), ClientError> {
    let profile = storefront.profile().fetch_profile().await?;

    tracing::info!("Username: {}", profile.username);
    if let Some(email) = &profile.email {
        tracing::info!("Email:    {email}");
    }
    if let Some(phone) = &profile.phone_number {
        tracing::info!("Phone:    {phone}");
    }
    if let Some(joined) = profile.date_joined {
        tracing::info!("Joined:   {}", joined.format("%d %b %Y"));
    }
    tracing::info!(
        "Address:  {}",
        profile
            .formatted_address()
            .as_deref()
            .unwrap_or("No address saved")
    );
    Ok(())
}

pub async fn orders(storefront: &Storefront) -> Result<(), ClientError> {
    let history = storefront.profile().fetch_orders().await?;
    if history.is_empty() {
        tracing::info!("No orders yet");
        return Ok(());
    }

    tracing::info!("Current orders ({})", history.current.len());
    history.current.iter().for_each(log_order);
    tracing::info!("Past orders ({})", history.past.len());
    history.past.iter().for_each(log_order);
    Ok(())
}

fn log_order(order: &Order) {
    tracing::info!(
        "  {}  {}  {}  {}",
        order.id,
        order.created_at.format("%Y-%m-%d"),
        order.status,
        order.total_amount
    );
}
