//! Integration test support for the Crafted Roots storefront client.
//!
//! [`MockBackend`] is a small axum server standing in for the REST backend.
//! It binds an ephemeral port, records every request it receives and lets
//! tests expire tokens or break the refresh endpoint on demand.
//!
//! ```rust,ignore
//! let backend = MockBackend::start().await;
//! let storefront = backend.storefront();
//! storefront.auth().login("meera", &password()).await.unwrap();
//! backend.expire_access_tokens();
//! storefront.cart().fetch().await.unwrap(); // refreshed and retried
//! assert_eq!(backend.requests_to(TOKEN_REFRESH_PATH).len(), 1);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use crafted_roots_storefront::{ClientConfig, Session, Storefront};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

/// Password every seeded account accepts.
pub const PASSWORD: &str = "correct horse";
/// Access token issued at login.
pub const LOGIN_ACCESS: &str = "a1";
/// Refresh token issued at login.
pub const LOGIN_REFRESH: &str = "r1";
/// Access token issued by the first successful refresh.
pub const REFRESHED_ACCESS: &str = "a2";

pub const LOGIN_PATH: &str = "/api/login/";
pub const REGISTER_PATH: &str = "/api/register/";
pub const LOGOUT_PATH: &str = "/api/logout/";
pub const TOKEN_REFRESH_PATH: &str = "/api/token/refresh/";
pub const SYNC_PATH: &str = "/api/sync-cart-wishlist/";
pub const CART_PATH: &str = "/api/cart/";
pub const PRODUCTS_PATH: &str = "/api/products/";
pub const PROFILE_PATH: &str = "/api/profile/";
pub const ORDERS_PATH: &str = "/api/orders/";
pub const CHANGE_PASSWORD_PATH: &str = "/api/change-password/";
pub const FORGOT_PASSWORD_PATH: &str = "/api/forgot-password/";
/// Authenticated endpoint that echoes nothing; used to inspect headers.
pub const ECHO_PATH: &str = "/api/echo/";

/// `SecretString` holding [`PASSWORD`].
#[must_use]
pub fn password() -> SecretString {
    SecretString::from(PASSWORD.to_owned())
}

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// The `Authorization` header, if sent.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }
}

struct BackendState {
    valid_access: HashSet<String>,
    refresh_token: String,
    next_access: String,
    refresh_fails: bool,
    refresh_delay: Option<Duration>,
    password: String,
    requests: Vec<RecordedRequest>,
    products: Vec<Value>,
    cart: Vec<Value>,
    orders: Vec<Value>,
}

impl BackendState {
    fn seeded() -> Self {
        Self {
            valid_access: HashSet::new(),
            refresh_token: LOGIN_REFRESH.to_string(),
            next_access: REFRESHED_ACCESS.to_string(),
            refresh_fails: false,
            refresh_delay: None,
            password: PASSWORD.to_string(),
            requests: Vec::new(),
            products: vec![
                json!({
                    "public_product_id": "PRD-1",
                    "title": "Clay Mug",
                    "price": "349.00",
                    "seller": "potter",
                    "category": "pottery",
                    "image": null
                }),
                json!({
                    "public_product_id": "PRD-2",
                    "title": "Jute Basket",
                    "price": "599.00",
                    "seller": "weaver",
                    "category": "home",
                    "image": null
                }),
            ],
            cart: Vec::new(),
            orders: vec![
                order("ORD-1", "PENDING"),
                order("ORD-2", "DELIVERED"),
                order("ORD-3", "SHIPPED"),
                order("ORD-4", "CANCELLED"),
            ],
        }
    }
}

fn order(id: &str, status: &str) -> Value {
    json!({
        "public_order_id": id,
        "status": status,
        "created_at": "2026-02-01T12:00:00Z",
        "total_amount": "349.00",
        "items": [{"product": "PRD-1", "quantity": 1, "price_at_purchase": "349.00"}]
    })
}

type SharedState = Arc<Mutex<BackendState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, BackendState> {
    // A panicking handler only poisons test state; keep serving.
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ============================================================================
// Server
// ============================================================================

/// In-process stand-in for the storefront REST backend.
pub struct MockBackend {
    addr: SocketAddr,
    state: SharedState,
    server: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    /// Start the backend on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if the port cannot be bound.
    pub async fn start() -> Self {
        let state: SharedState = Arc::new(Mutex::new(BackendState::seeded()));
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL of the backend.
    ///
    /// # Panics
    ///
    /// Never in practice; the address is always a valid URL.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("valid mock backend URL")
    }

    /// Client configuration pointing at this backend.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_api_base(self.url())
    }

    /// A storefront with a fresh in-memory session.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        Storefront::new(self.config(), Session::in_memory()).expect("Failed to build storefront")
    }

    /// Mark `token` as a valid access token.
    pub fn accept_access_token(&self, token: &str) {
        lock(&self.state).valid_access.insert(token.to_string());
    }

    /// Invalidate every access token issued so far.
    pub fn expire_access_tokens(&self) {
        lock(&self.state).valid_access.clear();
    }

    /// Make the refresh endpoint reject every refresh token.
    pub fn fail_refresh(&self) {
        lock(&self.state).refresh_fails = true;
    }

    /// Delay refresh responses, to widen race windows.
    pub fn delay_refresh(&self, delay: Duration) {
        lock(&self.state).refresh_delay = Some(delay);
    }

    /// Put a product in the server-side cart.
    ///
    /// # Panics
    ///
    /// Panics if the product is not seeded.
    pub fn seed_cart(&self, product_id: &str, quantity: u32) {
        let mut state = lock(&self.state);
        let product = find_product(&state.products, product_id).expect("unknown product");
        state
            .cart
            .push(json!({ "product": product, "quantity": quantity }));
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Requests received for `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    /// Quantity of `product_id` in the server-side cart.
    #[must_use]
    pub fn cart_quantity(&self, product_id: &str) -> Option<u64> {
        lock(&self.state)
            .cart
            .iter()
            .find(|line| line["product"]["public_product_id"] == product_id)
            .and_then(|line| line["quantity"].as_u64())
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Option<Value> = serde_json::from_slice(&body).ok();
    let path = uri.path().to_string();

    lock(&state).requests.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        headers: headers.clone(),
        body: body.clone(),
    });

    let body = body.unwrap_or(Value::Null);

    match (method, path.as_str()) {
        (Method::POST, LOGIN_PATH) => login(&state, &body),
        (Method::POST, REGISTER_PATH) => register(&body),
        (Method::POST, TOKEN_REFRESH_PATH) => refresh(&state, &body).await,
        (Method::POST, FORGOT_PASSWORD_PATH) => forgot_password(&body),
        (Method::GET, PRODUCTS_PATH) => products(&state, uri.query()),
        (method, path) => {
            if !is_authorized(&state, &headers) {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "detail": "Given token not valid for any token type",
                        "code": "token_not_valid"
                    })),
                )
                    .into_response();
            }
            authenticated(&state, &method, path, &body)
        }
    }
}

fn authenticated(state: &SharedState, method: &Method, path: &str, body: &Value) -> Response {
    match (method.clone(), path) {
        (Method::GET, ECHO_PATH) => Json(json!({ "ok": true })).into_response(),
        (Method::POST, LOGOUT_PATH) => Json(json!({})).into_response(),
        (Method::GET, SYNC_PATH) => {
            let state = lock(state);
            Json(json!({ "cart": state.cart, "wishlist": [] })).into_response()
        }
        (Method::POST, CART_PATH) => add_to_cart(state, body),
        (Method::PATCH, CART_PATH) => update_cart(state, body),
        (Method::DELETE, CART_PATH) => remove_from_cart(state, body),
        (Method::GET, PROFILE_PATH) => Json(json!({
            "username": "meera",
            "email": "meera@example.com",
            "phone_number": "+91 98290 00000",
            "date_joined": "2025-11-20T08:15:00Z",
            "address_line_1": "12 Loom Street",
            "city": "Jaipur",
            "postal_code": "302001",
            "country": "India"
        }))
        .into_response(),
        (Method::GET, ORDERS_PATH) => {
            Json(json!({ "orders": lock(state).orders })).into_response()
        }
        (Method::POST, CHANGE_PASSWORD_PATH) => change_password(state, body),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response(),
    }
}

fn is_authorized(state: &SharedState, headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| lock(state).valid_access.contains(token))
}

fn login(state: &SharedState, body: &Value) -> Response {
    let mut state = lock(state);
    if body["password"] != state.password.as_str() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "No active account found with the given credentials" })),
        )
            .into_response();
    }

    let username = body["username"].as_str().unwrap_or_default().to_string();
    let role = if username.starts_with("seller") {
        "seller"
    } else {
        "buyer"
    };
    state.valid_access.insert(LOGIN_ACCESS.to_string());

    Json(json!({
        "access": LOGIN_ACCESS,
        "refresh": state.refresh_token,
        "username": username,
        "role": role
    }))
    .into_response()
}

fn register(body: &Value) -> Response {
    if body["username"] == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "username": ["A user with that username already exists."],
                "email": ["user with this email already exists."]
            })),
        )
            .into_response();
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "user": { "username": body["username"], "email": body["email"], "role": "CUSTOMER" }
        })),
    )
        .into_response()
}

async fn refresh(state: &SharedState, body: &Value) -> Response {
    let delay = lock(state).refresh_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = lock(state);
    if state.refresh_fails || body["refresh"] != state.refresh_token.as_str() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" })),
        )
            .into_response();
    }

    let access = state.next_access.clone();
    state.valid_access.insert(access.clone());
    state.next_access = format!("{access}'");
    Json(json!({ "access": access })).into_response()
}

fn forgot_password(body: &Value) -> Response {
    if body["email"].as_str().is_none_or(str::is_empty) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "email": ["This field is required."] })),
        )
            .into_response();
    }
    Json(json!({ "message": "If an account exists, a reset link has been sent." })).into_response()
}

fn products(state: &SharedState, query: Option<&str>) -> Response {
    let category = query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .find_map(|pair| pair.strip_prefix("category="))
        .map(str::to_string);

    let results: Vec<Value> = lock(state)
        .products
        .iter()
        .filter(|p| category.as_deref().is_none_or(|c| p["category"] == c))
        .cloned()
        .collect();

    Json(json!({ "count": results.len(), "results": results })).into_response()
}

fn find_product(products: &[Value], product_id: &str) -> Option<Value> {
    products
        .iter()
        .find(|p| p["public_product_id"] == product_id)
        .cloned()
}

fn add_to_cart(state: &SharedState, body: &Value) -> Response {
    let mut state = lock(state);
    let product_id = body["product_id"].as_str().unwrap_or_default();
    let quantity = body["quantity"].as_u64().unwrap_or(1);

    let Some(product) = find_product(&state.products, product_id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Product not found" })),
        )
            .into_response();
    };

    if let Some(line) = state
        .cart
        .iter_mut()
        .find(|line| line["product"]["public_product_id"] == product_id)
    {
        let current = line["quantity"].as_u64().unwrap_or(0);
        line["quantity"] = json!(current + quantity);
    } else {
        state
            .cart
            .push(json!({ "product": product, "quantity": quantity }));
    }

    (
        StatusCode::CREATED,
        Json(json!({ "message": "Added to cart" })),
    )
        .into_response()
}

fn update_cart(state: &SharedState, body: &Value) -> Response {
    let mut state = lock(state);
    let product_id = body["product_id"].as_str().unwrap_or_default();
    let quantity = body["quantity"].as_u64().unwrap_or(0);

    if quantity < 1 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "quantity": ["Ensure this value is greater than or equal to 1."] })),
        )
            .into_response();
    }

    match state
        .cart
        .iter_mut()
        .find(|line| line["product"]["public_product_id"] == product_id)
    {
        Some(line) => {
            line["quantity"] = json!(quantity);
            Json(json!({ "message": "Cart updated" })).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Item not in cart" })),
        )
            .into_response(),
    }
}

fn remove_from_cart(state: &SharedState, body: &Value) -> Response {
    let mut state = lock(state);
    let product_id = body["product_id"].as_str().unwrap_or_default();
    let before = state.cart.len();
    state
        .cart
        .retain(|line| line["product"]["public_product_id"] != product_id);

    if state.cart.len() == before {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Item not in cart" })),
        )
            .into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

fn change_password(state: &SharedState, body: &Value) -> Response {
    let mut state = lock(state);
    if body["old_password"] != state.password.as_str() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "old_password": ["Wrong password."] })),
        )
            .into_response();
    }
    body["new_password"]
        .as_str()
        .unwrap_or_default()
        .clone_into(&mut state.password);
    Json(json!({ "message": "Password updated successfully." })).into_response()
}
