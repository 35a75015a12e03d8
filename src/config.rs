//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_STORAGE_PATH: &str = ".faucet/storage.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Name of the backend's session cookie.
pub const SESSION_COOKIE_NAME: &str = "auth-session";

/// Errors raised while building configuration or the OAuth client.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("missing OAuth domain")]
    MissingDomain,
    #[error("missing OAuth client id")]
    MissingClientId,
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("OAuth handshake failed: {0}")]
    Handshake(String),
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// How logout tears down the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogoutStrategy {
    /// Delegate to the OAuth client's own logout.
    Client,
    /// Hit the backend's `/api/logout` route.
    #[default]
    Redirect,
}

impl std::str::FromStr for LogoutStrategy {
    type Err = ConfigurationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "redirect" => Ok(Self::Redirect),
            _ => Err(ConfigurationError::InvalidValue { key: "FAUCET_LOGOUT_STRATEGY", value: raw.to_owned() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// OAuth provider settings. Validation happens in `auth::create_client`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    pub domain: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaucetConfig {
    pub base_url: String,
    pub auth: AuthConfig,
    pub logout: LogoutStrategy,
    pub storage_path: PathBuf,
    pub timeouts: HttpTimeouts,
    /// Backend session cookie sent with every API request, either a bare
    /// value or a full `name=value` pair.
    pub session_cookie: Option<String>,
}

impl FaucetConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `FAUCET_BASE_URL`: default `http://127.0.0.1:8080`
    /// - `FAUCET_AUTH_DOMAIN`, `FAUCET_AUTH_CLIENT_ID`, `FAUCET_AUTH_REDIRECT_URI`
    /// - `FAUCET_LOGOUT_STRATEGY`: `redirect` (default) or `client`
    /// - `FAUCET_STORAGE_PATH`: default `.faucet/storage.json`
    /// - `FAUCET_REQUEST_TIMEOUT_SECS`: default 30
    /// - `FAUCET_CONNECT_TIMEOUT_SECS`: default 10
    /// - `FAUCET_SESSION_COOKIE`: backend session cookie, unset by default
    ///
    /// # Errors
    ///
    /// Returns an error if `FAUCET_LOGOUT_STRATEGY` is set to an unknown value.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let base_url = std::env::var("FAUCET_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let auth = AuthConfig {
            domain: env_non_empty("FAUCET_AUTH_DOMAIN"),
            client_id: env_non_empty("FAUCET_AUTH_CLIENT_ID"),
            redirect_uri: env_non_empty("FAUCET_AUTH_REDIRECT_URI"),
        };
        let logout = match env_non_empty("FAUCET_LOGOUT_STRATEGY") {
            Some(raw) => raw.parse()?,
            None => LogoutStrategy::default(),
        };
        let storage_path =
            PathBuf::from(env_non_empty("FAUCET_STORAGE_PATH").unwrap_or_else(|| DEFAULT_STORAGE_PATH.to_owned()));
        let timeouts = HttpTimeouts {
            request_secs: env_parse("FAUCET_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("FAUCET_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        let session_cookie = env_non_empty("FAUCET_SESSION_COOKIE");

        Ok(Self { base_url, auth, logout, storage_path, timeouts, session_cookie })
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
