//! HTTP transport seam.
//!
//! Everything that talks to the backend goes through [`Transport`], so the
//! manager and request wrapper can be exercised against an in-memory fake.
//! [`ReqwestTransport`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::AuthError;

/// An outbound API call, relative to the transport's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path such as `/auth/refresh-token`, or an absolute URL.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Apply the default JSON headers and `Authorization: Bearer <token>`;
    /// headers already set on the request take precedence.
    pub fn authorized(mut self, token: &str) -> Result<Self, AuthError> {
        let mut headers = json_headers();
        headers.insert(AUTHORIZATION, bearer_value(token)?);
        headers.extend(std::mem::take(&mut self.headers));
        self.headers = headers;
        Ok(self)
    }

    /// Apply the default JSON headers only (unauthenticated endpoints).
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        let mut headers = json_headers();
        headers.extend(std::mem::take(&mut self.headers));
        self.headers = headers;
        self
    }

    /// The bearer token this request carries, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

fn bearer_value(token: &str) -> Result<HeaderValue, AuthError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| AuthError::Session("token is not a valid header value".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// A backend response with its body read to a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn from_json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AuthError> {
        serde_json::from_str(&self.body).map_err(|e| AuthError::Decode(e.to_string()))
    }

    /// Body as loose JSON, `None` if it is not JSON.
    pub fn json_value(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Whether the body carries the structured `requiresLogin: true` flag.
    pub fn requires_login(&self) -> bool {
        self.json_value()
            .and_then(|v| v.get("requiresLogin").and_then(serde_json::Value::as_bool))
            .unwrap_or(false)
    }

    /// The body's `message` field, or the status' canonical reason.
    pub fn message(&self) -> String {
        self.json_value()
            .and_then(|v| v.get("message").and_then(|m| m.as_str().map(str::to_string)))
            .or_else(|| {
                reqwest::StatusCode::from_u16(self.status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Turn a non-2xx response into [`AuthError::Api`].
    pub fn error_for_status(self) -> Result<Self, AuthError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(AuthError::Api {
                status: self.status,
                message: self.message(),
            })
        }
    }
}

/// Sends [`ApiRequest`]s to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Only failures to obtain a response are errors; any
    /// HTTP status comes back as an [`ApiResponse`].
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthError>;
}

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        if base_url.is_empty() {
            return Err(AuthError::Transport("base_url is empty".into()));
        }

        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `path` against the base URL; absolute URLs pass through.
    pub(crate) fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        let url = self.url_for(&request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, method = %request.method, url = %url, "HTTP request failed");
            AuthError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(format!("Failed to read response body: {e}")))?;
        debug!(method = %request.method, url = %url, status, "HTTP request completed");
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn authorized_sets_defaults_and_bearer() {
        let req = ApiRequest::get("/people").authorized("t1").unwrap();
        assert_eq!(req.headers[CONTENT_TYPE], "application/json");
        assert_eq!(req.headers[ACCEPT], "application/json");
        assert_eq!(req.bearer_token(), Some("t1"));
        assert!(req.headers[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn caller_headers_override_defaults() {
        let req = ApiRequest::post("/uploads")
            .header(CONTENT_TYPE, HeaderValue::from_static("text/csv"))
            .authorized("t1")
            .unwrap();
        assert_eq!(req.headers[CONTENT_TYPE], "text/csv");
        assert_eq!(req.headers.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(req.bearer_token(), Some("t1"));
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let err = ApiRequest::get("/x").authorized("bad\ntoken").unwrap_err();
        assert!(matches!(err, AuthError::Session(_)));
    }

    #[test]
    fn requires_login_flag_is_read_from_body() {
        let yes = ApiResponse::from_json(401, &serde_json::json!({ "requiresLogin": true }));
        let no = ApiResponse::from_json(401, &serde_json::json!({ "message": "nope" }));
        let text = ApiResponse::new(401, "Unauthorized");
        assert!(yes.requires_login());
        assert!(!no.requires_login());
        assert!(!text.requires_login());
    }

    #[test]
    fn message_prefers_body_then_reason() {
        let with_body = ApiResponse::from_json(400, &serde_json::json!({ "message": "Bad email" }));
        assert_eq!(with_body.message(), "Bad email");
        assert_eq!(ApiResponse::new(404, "").message(), "Not Found");
    }

    #[test]
    fn error_for_status_passes_success_through() {
        assert!(ApiResponse::new(204, "").error_for_status().is_ok());
        let err = ApiResponse::new(500, "").error_for_status().unwrap_err();
        assert_eq!(
            err,
            AuthError::Api {
                status: 500,
                message: "Internal Server Error".into(),
            }
        );
    }

    #[test]
    fn reqwest_transport_rejects_empty_base_url() {
        let err = ReqwestTransport::new("", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[test]
    fn url_for_joins_and_passes_absolute_through() {
        let transport =
            ReqwestTransport::new("https://api.ringside.test/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.base_url(), "https://api.ringside.test");
        assert_eq!(
            transport.url_for("/auth/login"),
            "https://api.ringside.test/auth/login"
        );
        assert_eq!(
            transport.url_for("people"),
            "https://api.ringside.test/people"
        );
        assert_eq!(
            transport.url_for("https://cdn.test/file"),
            "https://cdn.test/file"
        );
    }
}
