//! End-to-end tests for the cart service.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use crafted_roots_core::{Price, ProductId};
use crafted_roots_integration_tests::{CART_PATH, MockBackend, SYNC_PATH, password};
use crafted_roots_storefront::{ClientError, Storefront, StorefrontEvent};
use reqwest::Method;

async fn logged_in(backend: &MockBackend) -> Storefront {
    let storefront = backend.storefront();
    storefront.auth().login("meera", &password()).await.unwrap();
    storefront
}

#[tokio::test]
async fn test_fetch_replaces_local_cart() {
    let backend = MockBackend::start().await;
    backend.seed_cart("PRD-1", 2);
    backend.seed_cart("PRD-2", 1);
    let storefront = logged_in(&backend).await;

    let items = storefront.cart().fetch().await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].product.id, ProductId::new("PRD-1"));
    assert_eq!(items[0].quantity, 2);
    assert_eq!(storefront.cart().items().await, items);

    let totals = storefront.cart().totals(false).await;
    assert_eq!(totals.subtotal, Price::from_minor_units(129_700));
    let wrapped = storefront.cart().totals(true).await;
    assert_eq!(wrapped.total, Price::from_minor_units(130_700));
}

#[tokio::test]
async fn test_count() {
    let backend = MockBackend::start().await;
    backend.seed_cart("PRD-1", 5);
    let storefront = logged_in(&backend).await;

    assert_eq!(storefront.cart().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_count_is_zero_when_logged_out() {
    let backend = MockBackend::start().await;
    backend.seed_cart("PRD-1", 5);
    let storefront = backend.storefront();

    assert_eq!(storefront.cart().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_add_publishes_cart_updated() {
    let backend = MockBackend::start().await;
    let storefront = logged_in(&backend).await;
    let mut events = storefront.events().subscribe();

    let body = storefront
        .cart()
        .add(&ProductId::new("PRD-2"), 3)
        .await
        .unwrap();

    assert_eq!(body["message"], "Added to cart");
    assert_eq!(backend.cart_quantity("PRD-2"), Some(3));
    let sent = &backend.requests_to(CART_PATH)[0];
    assert_eq!(sent.method, Method::POST);
    assert_eq!(
        sent.body.as_ref().unwrap(),
        &serde_json::json!({ "product_id": "PRD-2", "quantity": 3 })
    );
    assert_eq!(events.try_recv().unwrap(), StorefrontEvent::CartUpdated);
}

#[tokio::test]
async fn test_add_new_product_appears_in_local_cart() {
    let backend = MockBackend::start().await;
    backend.seed_cart("PRD-1", 1);
    let storefront = logged_in(&backend).await;
    storefront.cart().fetch().await.unwrap();

    storefront
        .cart()
        .add(&ProductId::new("PRD-2"), 2)
        .await
        .unwrap();

    let items = storefront.cart().items().await;
    assert_eq!(items.len(), 2);
    let added = items
        .iter()
        .find(|item| item.product.id == ProductId::new("PRD-2"))
        .unwrap();
    assert_eq!(added.quantity, 2);
    assert_eq!(backend.requests_to(SYNC_PATH).len(), 2);
}

#[tokio::test]
async fn test_add_existing_line_bumps_without_reload() {
    let backend = MockBackend::start().await;
    backend.seed_cart("PRD-1", 1);
    let storefront = logged_in(&backend).await;
    storefront.cart().fetch().await.unwrap();

    storefront
        .cart()
        .add(&ProductId::new("PRD-1"), 2)
        .await
        .unwrap();

    assert_eq!(storefront.cart().items().await[0].quantity, 3);
    assert_eq!(backend.cart_quantity("PRD-1"), Some(3));
    assert_eq!(backend.requests_to(SYNC_PATH).len(), 1);
}

#[tokio::test]
async fn test_add_unknown_product_reports_backend_error() {
    let backend = MockBackend::start().await;
    let storefront = logged_in(&backend).await;
    let mut events = storefront.events().subscribe();

    let err = storefront
        .cart()
        .add(&ProductId::new("PRD-404"), 1)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Product not found");
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_update_quantity() {
    let backend = MockBackend::start().await;
    backend.seed_cart("PRD-1", 1);
    let storefront = logged_in(&backend).await;
    storefront.cart().fetch().await.unwrap();

    storefront
        .cart()
        .update_quantity(&ProductId::new("PRD-1"), 4)
        .await
        .unwrap();

    assert_eq!(backend.cart_quantity("PRD-1"), Some(4));
    assert_eq!(storefront.cart().items().await[0].quantity, 4);
    assert_eq!(backend.requests_to(CART_PATH)[0].method, Method::PATCH);
}

#[tokio::test]
async fn test_zero_quantity_never_reaches_server() {
    let backend = MockBackend::start().await;
    backend.seed_cart("PRD-1", 2);
    let storefront = logged_in(&backend).await;
    let before = storefront.cart().fetch().await.unwrap();
    let requests_before = backend.requests().len();

    let err = storefront
        .cart()
        .update_quantity(&ProductId::new("PRD-1"), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(backend.requests().len(), requests_before);
    assert!(backend.requests_to(CART_PATH).is_empty());
    assert_eq!(storefront.cart().items().await, before);
    assert_eq!(backend.cart_quantity("PRD-1"), Some(2));
}

#[tokio::test]
async fn test_update_missing_line_uses_backend_message() {
    let backend = MockBackend::start().await;
    let storefront = logged_in(&backend).await;

    let err = storefront
        .cart()
        .update_quantity(&ProductId::new("PRD-1"), 2)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Item not in cart");
}

#[tokio::test]
async fn test_remove() {
    let backend = MockBackend::start().await;
    backend.seed_cart("PRD-1", 1);
    backend.seed_cart("PRD-2", 1);
    let storefront = logged_in(&backend).await;
    storefront.cart().fetch().await.unwrap();
    let mut events = storefront.events().subscribe();

    storefront
        .cart()
        .remove(&ProductId::new("PRD-1"))
        .await
        .unwrap();

    let sent = &backend.requests_to(CART_PATH)[0];
    assert_eq!(sent.method, Method::DELETE);
    assert_eq!(sent.body.as_ref().unwrap()["product_id"], "PRD-1");
    assert_eq!(backend.cart_quantity("PRD-1"), None);
    let remaining = storefront.cart().items().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].product.id, ProductId::new("PRD-2"));
    assert_eq!(events.try_recv().unwrap(), StorefrontEvent::CartUpdated);
}

#[tokio::test]
async fn test_cart_fetch_after_expiry_is_transparent() {
    let backend = MockBackend::start().await;
    backend.seed_cart("PRD-2", 1);
    let storefront = logged_in(&backend).await;
    backend.expire_access_tokens();

    let items = storefront.cart().fetch().await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(backend.requests_to(SYNC_PATH).len(), 2);
}
