//! Faucet backend HTTP client.
//!
//! ROUTES
//! ======
//! - `GET  /api/requested?github=<nickname>` → `{ "github", "last_requested_time" }`
//! - `POST /api/claim` (form `address`)      → plain-text result
//! - `GET  /api/info`                        → session profile JSON
//! - `GET  /api/logout`                      → server-side session teardown
//!
//! ERROR HANDLING
//! ==============
//! Non-success responses carry their body verbatim in `ApiError::Status`;
//! the backend writes user-facing plain text there, so callers show it as-is.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use reqwest::header::{COOKIE, HeaderMap, HeaderValue};

use crate::config::{HttpTimeouts, SESSION_COOKIE_NAME};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A success body could not be parsed.
    #[error("response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Text to show the user: the backend's message for status errors,
    /// otherwise the error description.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { body, .. } if !body.trim().is_empty() => body.trim().to_owned(),
            other => other.to_string(),
        }
    }
}

/// Body of `GET /api/requested`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRequest {
    #[serde(default)]
    pub github: String,
    /// Unix seconds of the user's last claim.
    pub last_requested_time: i64,
}

/// Backend operations used by the claim checker and auth bridge.
#[async_trait::async_trait]
pub trait FaucetApi: Send + Sync {
    /// Fetch the last claim time for a GitHub nickname.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure, non-success status, or a
    /// malformed body.
    async fn last_requested(&self, github: &str) -> Result<LastRequest, ApiError>;

    /// Request funds for `address`. Returns the backend's confirmation text.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or non-success status.
    async fn claim(&self, address: &str) -> Result<String, ApiError>;

    /// Fetch the session profile the backend holds for this client.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure, non-success status, or a
    /// malformed body.
    async fn info(&self) -> Result<serde_json::Value, ApiError>;

    /// Tear down the server-side session.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or an error status.
    async fn logout(&self) -> Result<(), ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpFaucetApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpFaucetApi {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        Self::with_session(base_url, timeouts, None)
    }

    /// Client that presents `session_cookie` on every request. A bare value
    /// is sent under the backend's session cookie name.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn with_session(
        base_url: &str,
        timeouts: HttpTimeouts,
        session_cookie: Option<&str>,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = session_cookie.map(str::trim).filter(|c| !c.is_empty()) {
            let value = HeaderValue::from_str(&cookie_pair(cookie))
                .map_err(|e| ApiError::HttpClientBuild(format!("invalid session cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .default_headers(headers)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait::async_trait]
impl FaucetApi for HttpFaucetApi {
    async fn last_requested(&self, github: &str) -> Result<LastRequest, ApiError> {
        let response = self
            .http
            .get(self.url("/api/requested"))
            .query(&[("github", github)])
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let text = success_text(response).await?;
        parse_last_request(&text)
    }

    async fn claim(&self, address: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url("/api/claim"))
            .form(&[("address", address)])
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        success_text(response).await
    }

    async fn info(&self) -> Result<serde_json::Value, ApiError> {
        let response = self
            .http
            .get(self.url("/api/info"))
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let text = success_text(response).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .get(self.url("/api/logout"))
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status();
        // The route answers with a redirect to the identity provider.
        if status.is_success() || status.is_redirection() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status { status: status.as_u16(), body })
    }
}

async fn success_text(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Request(e.to_string()))?;
    if !status.is_success() {
        return Err(ApiError::Status { status: status.as_u16(), body: text });
    }
    Ok(text)
}

fn cookie_pair(cookie: &str) -> String {
    if cookie.contains('=') {
        cookie.to_owned()
    } else {
        format!("{SESSION_COOKIE_NAME}={cookie}")
    }
}

fn parse_last_request(text: &str) -> Result<LastRequest, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
