//! End-to-end tests for the token refresh and retry behaviour of
//! `ApiClient::request`.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use crafted_roots_integration_tests::{
    ECHO_PATH, LOGIN_ACCESS, MockBackend, REFRESHED_ACCESS, SYNC_PATH, TOKEN_REFRESH_PATH,
    password,
};
use crafted_roots_storefront::{
    ClientConfig, ClientError, RequestOptions, Session, Storefront, StorefrontEvent,
};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use url::Url;

async fn logged_in(backend: &MockBackend) -> Storefront {
    let storefront = backend.storefront();
    storefront.auth().login("meera", &password()).await.unwrap();
    storefront
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<StorefrontEvent>) -> Vec<StorefrontEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[tokio::test]
async fn test_caller_headers_pass_through_and_authorization_is_replaced() {
    let backend = MockBackend::start().await;
    let storefront = logged_in(&backend).await;
    let client = storefront.client();

    let options = RequestOptions::get()
        .with_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-42"),
        )
        .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));
    let response = client
        .request(client.endpoint("api/echo/").unwrap(), options)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let seen = backend.requests_to(ECHO_PATH);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization(), Some("Bearer a1"));
    assert_eq!(seen[0].headers.get("x-request-id").unwrap(), "req-42");
    assert_eq!(seen[0].headers.get("content-type").unwrap(), "application/json");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_retried_once() {
    let backend = MockBackend::start().await;
    let storefront = logged_in(&backend).await;
    backend.expire_access_tokens();

    let items = storefront.cart().fetch().await.unwrap();
    assert!(items.is_empty());

    let cart_requests = backend.requests_to(SYNC_PATH);
    let auth: Vec<_> = cart_requests.iter().map(|r| r.authorization()).collect();
    assert_eq!(auth, [Some("Bearer a1"), Some("Bearer a2")]);

    let refreshes = backend.requests_to(TOKEN_REFRESH_PATH);
    assert_eq!(refreshes.len(), 1);
    assert_eq!(refreshes[0].body.as_ref().unwrap()["refresh"], "r1");

    let stored = storefront.session().access_token().await.unwrap().unwrap();
    assert_eq!(stored.expose_secret(), REFRESHED_ACCESS);
    let refresh = storefront.session().refresh_token().await.unwrap().unwrap();
    assert_eq!(refresh.expose_secret(), "r1");
}

#[tokio::test]
async fn test_retry_response_is_returned_whatever_its_status() {
    let backend = MockBackend::start().await;
    let storefront = logged_in(&backend).await;
    backend.expire_access_tokens();
    let client = storefront.client();

    // The refreshed token works but the endpoint does not exist.
    let response = client
        .request(client.endpoint("api/missing/").unwrap(), RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(backend.requests_to("/api/missing/").len(), 2);
}

#[tokio::test]
async fn test_failed_refresh_returns_original_401_and_ends_session() {
    let backend = MockBackend::start().await;
    let storefront = logged_in(&backend).await;
    let mut events = storefront.events().subscribe();
    backend.expire_access_tokens();
    backend.fail_refresh();
    let client = storefront.client();

    let response = client
        .request(client.endpoint("api/echo/").unwrap(), RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "token_not_valid");

    // No retry.
    assert_eq!(backend.requests_to(ECHO_PATH).len(), 1);
    assert_eq!(backend.requests_to(TOKEN_REFRESH_PATH).len(), 1);

    // Session forgotten.
    let session = storefront.session();
    assert!(session.access_token().await.unwrap().is_none());
    assert!(session.refresh_token().await.unwrap().is_none());
    assert!(session.identity().await.unwrap().is_none());

    let events = drain(&mut events);
    let login_required: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, StorefrontEvent::LoginRequired { .. }))
        .collect();
    assert_eq!(
        login_required,
        [&StorefrontEvent::LoginRequired {
            redirect_to: "/sign-in/login".to_string()
        }]
    );
    assert!(events.contains(&StorefrontEvent::AuthChanged { identity: None }));
}

#[tokio::test]
async fn test_service_surfaces_unrecoverable_401_as_api_error() {
    let backend = MockBackend::start().await;
    let storefront = logged_in(&backend).await;
    backend.expire_access_tokens();
    backend.fail_refresh();

    let err = storefront.cart().fetch().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(
        err.user_message(),
        "Given token not valid for any token type"
    );
}

#[tokio::test]
async fn test_missing_refresh_token_skips_refresh() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();
    let mut events = storefront.events().subscribe();
    storefront.session().set_access_token("stale").await.unwrap();
    let client = storefront.client();

    let response = client
        .request(client.endpoint("api/echo/").unwrap(), RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(backend.requests_to(TOKEN_REFRESH_PATH).is_empty());
    assert_eq!(backend.requests_to(ECHO_PATH).len(), 1);
    // Nothing was cleared and nobody was told to log in.
    assert!(storefront.session().access_token().await.unwrap().is_some());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_request_without_token_sends_no_authorization() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();
    let client = storefront.client();

    let response = client
        .request(client.endpoint("api/echo/").unwrap(), RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(backend.requests_to(ECHO_PATH)[0].authorization(), None);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let backend = MockBackend::start().await;
    let storefront = logged_in(&backend).await;
    backend.expire_access_tokens();
    backend.delay_refresh(Duration::from_millis(100));

    let cart = storefront.cart();
    let results = tokio::join!(cart.fetch(), cart.fetch(), cart.fetch(), cart.fetch());
    for result in [results.0, results.1, results.2, results.3] {
        result.unwrap();
    }

    assert_eq!(backend.requests_to(TOKEN_REFRESH_PATH).len(), 1);
    let retried: Vec<_> = backend
        .requests_to(SYNC_PATH)
        .into_iter()
        .filter(|r| r.authorization() == Some("Bearer a2"))
        .collect();
    assert_eq!(retried.len(), 4);
}

#[tokio::test]
async fn test_explicit_refresh_rotates_access_token() {
    let backend = MockBackend::start().await;
    let storefront = logged_in(&backend).await;

    let token = storefront.client().refresh().await.unwrap().unwrap();

    assert_eq!(token.expose_secret(), REFRESHED_ACCESS);
    assert_ne!(token.expose_secret(), LOGIN_ACCESS);
    assert_eq!(backend.requests_to(TOKEN_REFRESH_PATH).len(), 1);
}

#[tokio::test]
async fn test_transport_error_is_not_retried() {
    // Nothing listens on the discard port.
    let config = ClientConfig::for_api_base(Url::parse("http://127.0.0.1:9/").unwrap());
    let storefront = Storefront::new(config, Session::in_memory()).unwrap();
    storefront.session().set_access_token("a1").await.unwrap();

    let err = storefront.cart().fetch().await.unwrap_err();

    assert!(matches!(err, ClientError::Http(_)));
    assert!(storefront.session().access_token().await.unwrap().is_some());
}
