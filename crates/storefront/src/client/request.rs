//! Request descriptors for [`ApiClient::request`](super::ApiClient::request).

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// Method, extra headers and JSON body of one API call.
///
/// The same descriptor is reused verbatim for the retry after a token
/// refresh, so it must not be consumed by sending.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    #[must_use]
    pub fn post(body: serde_json::Value) -> Self {
        Self::new(Method::POST).with_body(body)
    }

    #[must_use]
    pub fn patch(body: serde_json::Value) -> Self {
        Self::new(Method::PATCH).with_body(body)
    }

    #[must_use]
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header. Repeated names are appended, not replaced.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Headers actually sent for this request.
    ///
    /// `Content-Type: application/json` is the default and yields to a
    /// caller-supplied content type. Caller headers pass through untouched
    /// except `Authorization`, which always reflects `token` (and is absent
    /// when there is no token).
    #[must_use]
    pub fn merged_headers(&self, token: Option<&SecretString>) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.remove(AUTHORIZATION);

        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        if let Some(token) = token {
            match bearer(token) {
                Some(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                None => tracing::warn!("Stored access token is not a valid header value"),
            }
        }

        headers
    }
}

/// Build a `Bearer` authorization header value.
pub(crate) fn bearer(token: &SecretString) -> Option<HeaderValue> {
    let mut value = HeaderValue::try_from(format!("Bearer {}", token.expose_secret())).ok()?;
    value.set_sensitive(true);
    Some(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn token(raw: &str) -> SecretString {
        SecretString::from(raw.to_owned())
    }

    #[test]
    fn test_defaults_to_json_content_type() {
        let headers = RequestOptions::get().merged_headers(None);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_stored_token_sets_authorization() {
        let headers = RequestOptions::get().merged_headers(Some(&token("a1")));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer a1");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn test_caller_authorization_is_discarded() {
        let options = RequestOptions::get()
            .with_header(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));

        let with_token = options.merged_headers(Some(&token("a1")));
        assert_eq!(with_token.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(with_token.get(AUTHORIZATION).unwrap(), "Bearer a1");

        let without_token = options.merged_headers(None);
        assert!(without_token.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_caller_headers_pass_through() {
        let options = RequestOptions::post(serde_json::json!({}))
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("abc"),
            )
            .with_header(
                HeaderName::from_static("x-tag"),
                HeaderValue::from_static("one"),
            )
            .with_header(
                HeaderName::from_static("x-tag"),
                HeaderValue::from_static("two"),
            );

        let headers = options.merged_headers(Some(&token("a1")));
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get("x-request-id").unwrap(), "abc");
        let tags: Vec<_> = headers.get_all("x-tag").iter().collect();
        assert_eq!(tags, ["one", "two"]);
    }

    #[test]
    fn test_invalid_token_is_skipped() {
        let headers = RequestOptions::get().merged_headers(Some(&token("bad\ntoken")));
        assert!(headers.get(AUTHORIZATION).is_none());
    }
}
