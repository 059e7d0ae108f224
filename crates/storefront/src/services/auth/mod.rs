//! Authentication service.
//!
//! Login, registration, logout and password management against the
//! backend's auth endpoints. Successful logins are persisted to the
//! session; logout always forgets the local session.

use crafted_roots_core::{CredentialPair, Email, SessionIdentity, UserRole};
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::client::{ApiClient, RequestOptions, bearer, ensure_success, json_or_error};
use crate::error::ClientError;
use crate::events::StorefrontEvent;

const LOGIN_PATH: &str = "api/login/";
const REGISTER_PATH: &str = "api/register/";
const LOGOUT_PATH: &str = "api/logout/";
const CHANGE_PASSWORD_PATH: &str = "api/change-password/";
const FORGOT_PASSWORD_PATH: &str = "api/forgot-password/";

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Fields of the signup form.
#[derive(Debug, Clone)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl SignupForm {
    /// Check the form before anything is sent.
    ///
    /// Rules are checked in order and the first failure wins.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` naming the first broken rule.
    pub fn validate(&self) -> Result<Email, ClientError> {
        let password = self.password.expose_secret();

        if self.username.trim().is_empty()
            || self.email.trim().is_empty()
            || password.is_empty()
            || self.confirm_password.expose_secret().is_empty()
        {
            return Err(ClientError::validation("All fields are required"));
        }
        if password != self.confirm_password.expose_secret() {
            return Err(ClientError::validation("Passwords do not match"));
        }
        validate_password(password)?;

        Email::parse(self.email.trim())
            .map_err(|_| ClientError::validation("Please enter a valid email address"))
    }
}

/// Login responses come either flat or with the tokens and user nested.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    jwt: Option<TokenBody>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<UserRole>,
    #[serde(default)]
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<UserRole>,
}

impl LoginResponse {
    fn into_session(
        self,
        entered_username: &str,
    ) -> Result<(CredentialPair, SessionIdentity), ClientError> {
        let (access, refresh) = match (self.access, self.refresh, self.jwt) {
            (Some(access), Some(refresh), _) => (access, refresh),
            (_, _, Some(jwt)) => (jwt.access, jwt.refresh),
            _ => {
                return Err(ClientError::Decode(serde::de::Error::custom(
                    "login response has no token pair",
                )));
            }
        };

        let (user_name, user_role) = self
            .user
            .map_or((None, None), |user| (user.username, user.role));
        let username = self
            .username
            .or(user_name)
            .unwrap_or_else(|| entered_username.to_owned());
        let role = self.role.or(user_role).unwrap_or(UserRole::Buyer);

        Ok((
            CredentialPair::new(access, refresh),
            SessionIdentity::new(username, role),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

/// Authentication service.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Log in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if either field is empty and
    /// `ClientError::Api` if the backend rejects the credentials.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionIdentity, ClientError> {
        let username = username.trim();
        if username.is_empty() || password.expose_secret().is_empty() {
            return Err(ClientError::validation(
                "Please enter both username and password",
            ));
        }

        let response = self
            .client
            .http()
            .post(self.client.endpoint(LOGIN_PATH)?)
            .json(&json!({
                "username": username,
                "password": password.expose_secret(),
            }))
            .send()
            .await?;

        let body: LoginResponse = json_or_error(response, "Invalid username or password").await?;
        let (credentials, identity) = body.into_session(username)?;

        self.client
            .session()
            .store_login(&credentials, &identity)
            .await?;
        self.client.events().publish(StorefrontEvent::AuthChanged {
            identity: Some(identity.clone()),
        });

        tracing::info!(username = %identity.username, role = %identity.role, "Logged in");
        Ok(identity)
    }

    /// Create an account. Does not log in.
    ///
    /// Returns whatever the backend sent back.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the form is invalid and
    /// `ClientError::Api` (with per-field messages) if the backend rejects it.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: &SignupForm) -> Result<serde_json::Value, ClientError> {
        let email = form.validate()?;

        let response = self
            .client
            .http()
            .post(self.client.endpoint(REGISTER_PATH)?)
            .json(&json!({
                "username": form.username.trim(),
                "email": email.as_str(),
                "password": form.password.expose_secret(),
            }))
            .send()
            .await?;

        let body = json_or_error(response, "Registration failed. Please try again.").await?;
        tracing::info!("Account created");
        Ok(body)
    }

    /// Log out.
    ///
    /// The server is told to revoke the refresh token, but the local session
    /// is cleared and `AuthChanged` published whatever the server says.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the server could not be reached (the
    /// local session is still cleared) and `ClientError::Session` if the
    /// store fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ClientError> {
        let session = self.client.session();
        let notified = self.notify_logout().await;

        let cleared = session.clear().await;
        self.client
            .events()
            .publish(StorefrontEvent::AuthChanged { identity: None });
        tracing::info!("Logged out");

        cleared?;
        notified
    }

    async fn notify_logout(&self) -> Result<(), ClientError> {
        let session = self.client.session();
        let Some(refresh) = session.refresh_token().await? else {
            return Ok(());
        };

        let mut request = self
            .client
            .http()
            .post(self.client.endpoint(LOGOUT_PATH)?)
            .json(&json!({ "refresh": refresh.expose_secret() }));
        if let Some(value) = session.access_token().await?.as_ref().and_then(bearer) {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Server rejected logout");
        }
        Ok(())
    }

    /// Who is logged in, according to the stored session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Session` if the store fails.
    pub async fn current_user(&self) -> Result<Option<SessionIdentity>, ClientError> {
        Ok(self.client.session().identity().await?)
    }

    /// Whether an access token is stored.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Session` if the store fails.
    pub async fn is_authenticated(&self) -> Result<bool, ClientError> {
        Ok(self.client.session().access_token().await?.is_some())
    }

    /// Change the logged-in user's password.
    ///
    /// Returns the backend's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if either password is empty or the
    /// new one is too short, and `ClientError::Api` if the backend refuses
    /// (e.g. wrong old password).
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<String, ClientError> {
        if old_password.expose_secret().is_empty() || new_password.expose_secret().is_empty() {
            return Err(ClientError::validation("All fields are required"));
        }
        validate_password(new_password.expose_secret())?;

        let response = self
            .client
            .request_path(
                CHANGE_PASSWORD_PATH,
                RequestOptions::post(json!({
                    "old_password": old_password.expose_secret(),
                    "new_password": new_password.expose_secret(),
                })),
            )
            .await?;

        let body: MessageResponse = json_or_error(response, "Failed to change password").await?;
        Ok(body
            .message
            .unwrap_or_else(|| "Password updated successfully.".to_string()))
    }

    /// Ask for a password reset link.
    ///
    /// Returns the backend's message, which does not reveal whether the
    /// account exists.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a malformed email and
    /// `ClientError::Api` if the backend refuses.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, email: &str) -> Result<String, ClientError> {
        let email = Email::parse(email.trim())
            .map_err(|_| ClientError::validation("Please enter a valid email address"))?;

        let response = self
            .client
            .http()
            .post(self.client.endpoint(FORGOT_PASSWORD_PATH)?)
            .json(&json!({ "email": email.as_str() }))
            .send()
            .await?;

        let response = ensure_success(response, "Failed to send reset link").await?;
        let body: MessageResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(body
            .message
            .unwrap_or_else(|| "If an account exists, a reset link has been sent.".to_string()))
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), ClientError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ClientError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}
