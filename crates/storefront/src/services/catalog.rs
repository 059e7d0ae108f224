//! Public product listings.

use crafted_roots_core::Product;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::client::{ApiClient, json_or_error};
use crate::error::ClientError;

const PRODUCTS_PATH: &str = "api/products/";

/// Filters for the product listing. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
}

impl ProductQuery {
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }
}

/// Listings are returned bare or paginated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProductsResponse {
    Page { results: Vec<Product> },
    List(Vec<Product>),
}

/// Product catalog. Needs no login.
#[derive(Debug, Clone)]
pub struct CatalogService {
    client: ApiClient,
}

impl CatalogService {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Products matching `query`, fresh from the server.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the server refuses.
    #[instrument(skip(self))]
    pub async fn fetch_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ClientError> {
        let response = self
            .client
            .http()
            .get(self.client.endpoint(PRODUCTS_PATH)?)
            .query(query)
            .send()
            .await?;

        let body: ProductsResponse = json_or_error(response, "Failed to fetch products").await?;
        Ok(match body {
            ProductsResponse::Page { results } => results,
            ProductsResponse::List(products) => products,
        })
    }
}
