//! End-to-end tests for login, signup, logout and password management.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use crafted_roots_core::{SessionIdentity, UserRole};
use crafted_roots_integration_tests::{
    CHANGE_PASSWORD_PATH, FORGOT_PASSWORD_PATH, LOGIN_PATH, LOGOUT_PATH, MockBackend,
    REGISTER_PATH, password,
};
use crafted_roots_storefront::services::SignupForm;
use crafted_roots_storefront::{ClientError, StorefrontEvent};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

fn secret(raw: &str) -> SecretString {
    SecretString::from(raw.to_owned())
}

#[tokio::test]
async fn test_login_persists_session_and_announces_it() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();
    let mut events = storefront.events().subscribe();

    let identity = storefront.auth().login("meera", &password()).await.unwrap();

    assert_eq!(identity, SessionIdentity::new("meera", UserRole::Buyer));
    let session = storefront.session();
    assert_eq!(
        session.access_token().await.unwrap().unwrap().expose_secret(),
        "a1"
    );
    assert_eq!(
        session.refresh_token().await.unwrap().unwrap().expose_secret(),
        "r1"
    );
    assert_eq!(storefront.auth().current_user().await.unwrap(), Some(identity.clone()));
    assert!(storefront.auth().is_authenticated().await.unwrap());
    assert_eq!(
        events.try_recv().unwrap(),
        StorefrontEvent::AuthChanged {
            identity: Some(identity)
        }
    );

    // Login is not sent with a bearer token.
    assert_eq!(backend.requests_to(LOGIN_PATH)[0].authorization(), None);
}

#[tokio::test]
async fn test_seller_login_keeps_role() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();

    let identity = storefront
        .auth()
        .login("seller-anil", &password())
        .await
        .unwrap();

    assert_eq!(identity.role, UserRole::Seller);
    assert_eq!(identity.role.landing_route(), "/seller_dashboard");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();

    let err = storefront
        .auth()
        .login("meera", &secret("wrong"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(
        err.user_message(),
        "No active account found with the given credentials"
    );
    assert!(!storefront.auth().is_authenticated().await.unwrap());
    // A rejected login is not a session refresh.
    assert!(backend.requests_to("/api/token/refresh/").is_empty());
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();

    let err = storefront
        .auth()
        .login("  ", &password())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Please enter both username and password");

    let err = storefront
        .auth()
        .login("meera", &secret(""))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_register_joins_field_errors() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();
    let form = SignupForm {
        username: "taken".to_string(),
        email: "taken@example.com".to_string(),
        password: secret("longenough"),
        confirm_password: secret("longenough"),
    };

    let err = storefront.auth().register(&form).await.unwrap_err();

    assert_eq!(
        err.user_message(),
        "email: user with this email already exists.; \
         username: A user with that username already exists."
    );
    match err {
        ClientError::Api(api) => assert_eq!(api.field_errors.len(), 2),
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_register_success_does_not_log_in() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();
    let form = SignupForm {
        username: "asha".to_string(),
        email: "asha@example.com".to_string(),
        password: secret("longenough"),
        confirm_password: secret("longenough"),
    };

    let body = storefront.auth().register(&form).await.unwrap();

    assert_eq!(body["user"]["username"], "asha");
    let sent = &backend.requests_to(REGISTER_PATH)[0];
    let sent_body = sent.body.as_ref().unwrap();
    assert_eq!(sent_body["email"], "asha@example.com");
    assert!(sent_body.get("confirm_password").is_none());
    assert!(!storefront.auth().is_authenticated().await.unwrap());
}

#[tokio::test]
async fn test_register_validation_happens_before_network() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();
    let form = SignupForm {
        username: "asha".to_string(),
        email: "asha@example".to_string(),
        password: secret("longenough"),
        confirm_password: secret("longenough"),
    };

    let err = storefront.auth().register(&form).await.unwrap_err();

    assert_eq!(err.user_message(), "Please enter a valid email address");
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_logout_clears_session_and_revokes_refresh_token() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();
    storefront.auth().login("meera", &password()).await.unwrap();
    let mut events = storefront.events().subscribe();

    storefront.auth().logout().await.unwrap();

    let sent = &backend.requests_to(LOGOUT_PATH)[0];
    assert_eq!(sent.authorization(), Some("Bearer a1"));
    assert_eq!(sent.body.as_ref().unwrap()["refresh"], "r1");
    assert!(storefront.auth().current_user().await.unwrap().is_none());
    assert!(!storefront.auth().is_authenticated().await.unwrap());
    assert_eq!(
        events.try_recv().unwrap(),
        StorefrontEvent::AuthChanged { identity: None }
    );
}

#[tokio::test]
async fn test_logout_when_not_logged_in_skips_server() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();

    storefront.auth().logout().await.unwrap();

    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_change_password() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();
    storefront.auth().login("meera", &password()).await.unwrap();

    let err = storefront
        .auth()
        .change_password(&secret("not it"), &secret("battery staple"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "old_password: Wrong password.");

    let message = storefront
        .auth()
        .change_password(&password(), &secret("battery staple"))
        .await
        .unwrap();
    assert_eq!(message, "Password updated successfully.");
    assert_eq!(backend.requests_to(CHANGE_PASSWORD_PATH).len(), 2);

    let err = storefront
        .auth()
        .change_password(&secret("battery staple"), &secret("short"))
        .await
        .unwrap_err();
    assert_eq!(
        err.user_message(),
        "Password must be at least 8 characters long"
    );
    assert_eq!(backend.requests_to(CHANGE_PASSWORD_PATH).len(), 2);
}

#[tokio::test]
async fn test_forgot_password() {
    let backend = MockBackend::start().await;
    let storefront = backend.storefront();

    let message = storefront
        .auth()
        .forgot_password("meera@example.com")
        .await
        .unwrap();

    assert_eq!(message, "If an account exists, a reset link has been sent.");
    assert_eq!(
        backend.requests_to(FORGOT_PASSWORD_PATH)[0]
            .body
            .as_ref()
            .unwrap()["email"],
        "meera@example.com"
    );
}
