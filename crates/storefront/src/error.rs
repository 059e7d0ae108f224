//! Unified error handling for the storefront client.
//!
//! Every fallible client or service operation returns `Result<T, ClientError>`.
//! Non-2xx responses the backend answers with are decoded into [`ApiError`],
//! whose `message` is fit to show the user as an inline banner.

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::config::ConfigError;
use crate::session::SessionError;

/// Field name Django REST framework uses for errors not tied to one field.
const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Client-level error type for the storefront.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failed (connect, DNS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// A success response did not have the expected shape.
    #[error("Response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// Session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status of an application error, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api(err) => Some(err.status),
            _ => None,
        }
    }

    /// Whether the backend rejected the session even after a refresh attempt.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Message suitable for an inline error banner.
    ///
    /// Transport, decoding and storage details are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => err.message.clone(),
            Self::Validation(msg) => msg.clone(),
            Self::Http(_) => "Could not reach the store. Please try again.".to_string(),
            Self::Decode(_) => "Unexpected response from the store".to_string(),
            Self::Config(err) => err.to_string(),
            Self::Session(_) | Self::Url(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// An application error returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (HTTP {status})")]
pub struct ApiError {
    /// Response status.
    pub status: StatusCode,
    /// Human-readable message.
    pub message: String,
    /// Field-level validation errors, keyed by field name.
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ApiError {
    /// Consume an error response and decode its body.
    ///
    /// If the body cannot be read at all, the message falls back as for a
    /// malformed body.
    pub async fn from_response(response: reqwest::Response, fallback: &str) -> Self {
        let status = response.status();
        match response.text().await {
            Ok(body) => Self::from_body(status, &body, fallback),
            Err(e) => {
                tracing::warn!(status = %status, error = %e, "Failed to read error response body");
                Self::malformed(status, fallback)
            }
        }
    }

    /// Decode an error body.
    ///
    /// The message is taken from `detail`, then `error`, then a join of all
    /// field error lists (`"field: message"`, non-field errors unprefixed).
    /// Bodies that are not JSON map to the status text.
    #[must_use]
    pub fn from_body(status: StatusCode, body: &str, fallback: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    status = %status,
                    error = %e,
                    body = %body.chars().take(200).collect::<String>(),
                    "Error response is not JSON"
                );
                return Self::malformed(status, fallback);
            }
        };

        match value {
            Value::Object(map) => {
                if let Some(message) = map.get("detail").and_then(Value::as_str) {
                    return Self::with_message(status, message);
                }
                if let Some(message) = map.get("error").and_then(Value::as_str) {
                    return Self::with_message(status, message);
                }

                let field_errors: BTreeMap<String, Vec<String>> = map
                    .into_iter()
                    .map(|(field, errors)| (field, flatten_messages(errors)))
                    .filter(|(_, errors)| !errors.is_empty())
                    .collect();

                let message = join_field_errors(&field_errors);
                Self {
                    status,
                    message: if message.is_empty() {
                        fallback.to_string()
                    } else {
                        message
                    },
                    field_errors,
                }
            }
            Value::String(message) if !message.is_empty() => Self::with_message(status, &message),
            Value::Array(items) => {
                let messages = flatten_messages(Value::Array(items));
                if messages.is_empty() {
                    Self::with_message(status, fallback)
                } else {
                    Self::with_message(status, &messages.join("; "))
                }
            }
            _ => Self::with_message(status, fallback),
        }
    }

    fn with_message(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
            field_errors: BTreeMap::new(),
        }
    }

    fn malformed(status: StatusCode, fallback: &str) -> Self {
        let message = status.canonical_reason().map_or_else(
            || fallback.to_string(),
            |reason| format!("{fallback}: {reason}"),
        );
        Self::with_message(status, &message)
    }
}

/// Collect the string messages in a field's error value.
fn flatten_messages(value: Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items.into_iter().flat_map(flatten_messages).collect(),
        Value::Object(map) => map.into_values().flat_map(flatten_messages).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

fn join_field_errors(field_errors: &BTreeMap<String, Vec<String>>) -> String {
    let general = field_errors
        .get(NON_FIELD_ERRORS)
        .into_iter()
        .flatten()
        .cloned();

    let per_field = field_errors
        .iter()
        .filter(|(field, _)| field.as_str() != NON_FIELD_ERRORS)
        .flat_map(|(field, errors)| errors.iter().map(move |e| format!("{field}: {e}")));

    general.chain(per_field).collect::<Vec<_>>().join("; ")
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;
