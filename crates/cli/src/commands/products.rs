//! Product listing command.

use crafted_roots_storefront::services::ProductQuery;
use crafted_roots_storefront::{ClientError, Storefront};

pub async fn list(
    storefront: &Storefront,
    category: Option<String>,
    search: Option<String>,
) -> Result<(), ClientError> {
    let query = ProductQuery {
        category,
        search,
        ..ProductQuery::default()
    };
    let products = storefront.catalog().fetch_products(&query).await?;

    tracing::info!("{} product(s)", products.len());
    for product in &products {
        tracing::info!(
            "{}  {}  {}{}",
            product.id,
            product.title,
            product.price,
            product
                .seller
                .as_deref()
                .map(|seller| format!("  by {seller}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}
