//! OpenID Connect client over reqwest.
//!
//! The interactive window is out of our hands: `PopupAuthorizer` opens the
//! authorization URL wherever the host can (browser, terminal prompt) and
//! hands back the access token from the redirect. Everything else, from
//! discovery to the profile fetch and logout, is plain HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;

use super::{AuthFlowError, ClientHandle, LoginOptions, OAuthClient};
use crate::config::{AuthConfig, ConfigurationError, HttpTimeouts};
use crate::state::UserProfile;

pub const DEFAULT_SCOPE: &str = "openid profile email";

/// Opens the authorization window and waits for its redirect.
#[async_trait::async_trait]
pub trait PopupAuthorizer: Send + Sync {
    /// Returns the access token delivered to the redirect.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Cancelled`] if the user closes the window, or
    /// [`AuthFlowError::Rejected`] if the provider reports an error.
    async fn authorize(&self, authorize_url: &str) -> Result<String, AuthFlowError>;
}

#[derive(Debug, Clone, Deserialize)]
struct Discovery {
    authorization_endpoint: String,
    userinfo_endpoint: String,
}

/// Build a ready client for `config`, running the discovery handshake.
///
/// # Errors
///
/// Returns an error if the domain or client id is missing, or the provider's
/// discovery document cannot be fetched.
pub async fn create_client(
    config: &AuthConfig,
    timeouts: HttpTimeouts,
    popup: Arc<dyn PopupAuthorizer>,
) -> Result<ClientHandle, ConfigurationError> {
    let domain = non_blank(config.domain.as_deref()).ok_or(ConfigurationError::MissingDomain)?;
    let client_id = non_blank(config.client_id.as_deref()).ok_or(ConfigurationError::MissingClientId)?;
    let client = OidcClient::connect(domain, client_id, config.redirect_uri.clone(), timeouts, popup).await?;
    Ok(ClientHandle::Ready(Arc::new(client)))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Base URL for a provider domain. Bare hosts get `https://`.
fn issuer_base(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_owned()
    } else {
        format!("https://{domain}")
    }
}

pub struct OidcClient {
    http: reqwest::Client,
    base: String,
    client_id: String,
    redirect_uri: Option<String>,
    discovery: Discovery,
    popup: Arc<dyn PopupAuthorizer>,
    access_token: Mutex<Option<String>>,
}

impl OidcClient {
    async fn connect(
        domain: &str,
        client_id: &str,
        redirect_uri: Option<String>,
        timeouts: HttpTimeouts,
        popup: Arc<dyn PopupAuthorizer>,
    ) -> Result<Self, ConfigurationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigurationError::HttpClientBuild(e.to_string()))?;

        let base = issuer_base(domain);
        let response = http
            .get(format!("{base}/.well-known/openid-configuration"))
            .send()
            .await
            .map_err(|e| ConfigurationError::Handshake(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConfigurationError::Handshake(format!("discovery returned {status}")));
        }
        let discovery: Discovery = response
            .json()
            .await
            .map_err(|e| ConfigurationError::Handshake(e.to_string()))?;

        tracing::info!(issuer = %base, "OAuth client ready");
        Ok(Self {
            http,
            base,
            client_id: client_id.to_owned(),
            redirect_uri,
            discovery,
            popup,
            access_token: Mutex::new(None),
        })
    }

    /// Authorization URL for an implicit-grant popup.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider advertised an unparseable endpoint.
    pub fn authorize_url(&self, options: &LoginOptions) -> Result<String, AuthFlowError> {
        let mut url = reqwest::Url::parse(&self.discovery.authorization_endpoint)
            .map_err(|e| AuthFlowError::Rejected(format!("bad authorization endpoint: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);
            query.append_pair("response_type", "token");
            query.append_pair("scope", options.scope.as_deref().unwrap_or(DEFAULT_SCOPE));
            if let Some(redirect_uri) = &self.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
            if let Some(connection) = &options.connection {
                query.append_pair("connection", connection);
            }
        }
        Ok(url.into())
    }

    /// Provider logout URL for this client.
    ///
    /// # Errors
    ///
    /// Returns an error if the issuer base is not a valid URL.
    pub fn logout_url(&self) -> Result<String, AuthFlowError> {
        let mut url = reqwest::Url::parse(&format!("{}/v2/logout", self.base))
            .map_err(|e| AuthFlowError::Logout(format!("bad logout endpoint: {e}")))?;
        url.query_pairs_mut().append_pair("client_id", &self.client_id);
        Ok(url.into())
    }

    fn token(&self) -> Option<String> {
        self.access_token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self.access_token.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = token;
    }
}

#[async_trait::async_trait]
impl OAuthClient for OidcClient {
    async fn login_with_popup(&self, options: &LoginOptions) -> Result<(), AuthFlowError> {
        let url = self.authorize_url(options)?;
        let token = self.popup.authorize(&url).await?;
        if token.trim().is_empty() {
            return Err(AuthFlowError::Rejected("empty access token".to_owned()));
        }
        self.set_token(Some(token));
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<UserProfile>, AuthFlowError> {
        let Some(token) = self.token() else {
            return Ok(None);
        };
        let response = self
            .http
            .get(&self.discovery.userinfo_endpoint)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthFlowError::Profile(e.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.set_token(None);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthFlowError::Profile(format!("{status}: {body}")));
        }
        let profile = response
            .json::<UserProfile>()
            .await
            .map_err(|e| AuthFlowError::Profile(e.to_string()))?;
        Ok(Some(profile))
    }

    async fn logout(&self) -> Result<(), AuthFlowError> {
        self.set_token(None);
        let response = self
            .http
            .get(self.logout_url()?)
            .send()
            .await
            .map_err(|e| AuthFlowError::Logout(e.to_string()))?;
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(AuthFlowError::Logout(format!("provider returned {status}")))
        }
    }
}

#[cfg(test)]
#[path = "oidc_test.rs"]
mod tests;
