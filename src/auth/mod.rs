//! Auth bridge: OAuth login/logout and session publication.
//!
//! SYSTEM CONTEXT
//! ==============
//! The OAuth provider does the real work (authorization window, tokens,
//! profile). This module only drives it through the `OAuthClient` seam and
//! mirrors the outcome into the shared `Store`, the notification surface, and
//! durable storage.
//!
//! ERROR HANDLING
//! ==============
//! Login failures are recovered locally: the user gets a danger toast, the
//! authentication cells keep their previous values, and `popup_open` is
//! released by a `FlagGuard` on every exit path. Only one popup flow may run
//! at a time; a second attempt is rejected, with a toast, without touching
//! the flag.

pub mod oidc;

use std::fmt;
use std::sync::Arc;

pub use oidc::{OidcClient, PopupAuthorizer, create_client};

use crate::api::FaucetApi;
use crate::config::LogoutStrategy;
use crate::notify::{Notifier, Toast};
use crate::state::{FlagGuard, Store, UserProfile};
use crate::storage::{GITHUB_USER_KEY, KeyValueStore};

#[derive(Debug, thiserror::Error)]
pub enum AuthFlowError {
    #[error("login popup was closed before completing")]
    Cancelled,
    #[error("login rejected: {0}")]
    Rejected(String),
    #[error("profile fetch failed: {0}")]
    Profile(String),
    #[error("a login popup is already open")]
    PopupAlreadyOpen,
    #[error("OAuth client is not configured")]
    ClientAbsent,
    #[error("logout failed: {0}")]
    Logout(String),
}

/// Options forwarded to the provider's authorization request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginOptions {
    /// Upstream identity connection, e.g. `github`.
    pub connection: Option<String>,
    /// Space-separated scopes; the client default applies when `None`.
    pub scope: Option<String>,
}

impl LoginOptions {
    #[must_use]
    pub fn github() -> Self {
        Self { connection: Some("github".to_owned()), scope: None }
    }
}

/// External OAuth SDK surface.
#[async_trait::async_trait]
pub trait OAuthClient: Send + Sync {
    /// Run the interactive authorization flow.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Cancelled`] when the user closes the window,
    /// or another variant when the provider rejects the attempt.
    async fn login_with_popup(&self, options: &LoginOptions) -> Result<(), AuthFlowError>;

    /// Profile of the logged-in user, `None` when nobody is logged in.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile request fails.
    async fn get_user(&self) -> Result<Option<UserProfile>, AuthFlowError>;

    /// End the provider session.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider logout request fails.
    async fn logout(&self) -> Result<(), AuthFlowError>;
}

/// An OAuth client that may not have been configured.
#[derive(Clone, Default)]
pub enum ClientHandle {
    Ready(Arc<dyn OAuthClient>),
    #[default]
    Absent,
}

impl ClientHandle {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    fn client(&self) -> Option<&Arc<dyn OAuthClient>> {
        match self {
            Self::Ready(client) => Some(client),
            Self::Absent => None,
        }
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("ClientHandle::Ready"),
            Self::Absent => f.write_str("ClientHandle::Absent"),
        }
    }
}

/// Current profile, or the empty record when there is no client, nobody is
/// logged in, or the fetch fails.
pub async fn github_data(client: &ClientHandle) -> UserProfile {
    let Some(client) = client.client() else {
        return UserProfile::default();
    };
    match client.get_user().await {
        Ok(profile) => profile.unwrap_or_default(),
        Err(e) => {
            tracing::debug!(error = %e, "profile unavailable");
            UserProfile::default()
        }
    }
}

// =============================================================================
// BRIDGE
// =============================================================================

pub struct AuthBridge {
    store: Store,
    notifier: Arc<dyn Notifier>,
    storage: Arc<dyn KeyValueStore>,
    api: Arc<dyn FaucetApi>,
    logout: LogoutStrategy,
}

impl AuthBridge {
    #[must_use]
    pub fn new(
        store: Store,
        notifier: Arc<dyn Notifier>,
        storage: Arc<dyn KeyValueStore>,
        api: Arc<dyn FaucetApi>,
        logout: LogoutStrategy,
    ) -> Self {
        Self { store, notifier, storage, api, logout }
    }

    /// Log in through the provider's popup and publish the resulting profile.
    ///
    /// On success the profile is published to the store, both authenticated
    /// flags are raised, a greeting toast is shown, and the nickname is
    /// persisted, all before `popup_open` drops back to `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is absent, a popup is already open, or
    /// the flow fails. Failures have already been shown to the user.
    pub async fn login_with_popup(
        &self,
        client: &ClientHandle,
        options: LoginOptions,
    ) -> Result<UserProfile, AuthFlowError> {
        let Some(oauth) = client.client() else {
            return Err(self.fail(AuthFlowError::ClientAbsent));
        };
        let Some(_popup) = FlagGuard::try_hold(&self.store.popup_open, true) else {
            return Err(self.fail(AuthFlowError::PopupAlreadyOpen));
        };

        match self.complete_login(oauth.as_ref(), &options).await {
            Ok(profile) => Ok(profile),
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn complete_login(&self, oauth: &dyn OAuthClient, options: &LoginOptions) -> Result<UserProfile, AuthFlowError> {
        oauth.login_with_popup(options).await?;
        let profile = oauth
            .get_user()
            .await?
            .ok_or_else(|| AuthFlowError::Profile("provider returned no profile".to_owned()))?;
        let nickname = profile
            .nickname()
            .ok_or_else(|| AuthFlowError::Profile("profile has no nickname".to_owned()))?
            .to_owned();

        self.store.github_user.set(profile.clone());
        self.store.is_authenticated.set(true);
        self.store.is_github_auth.set(true);
        self.store.error.set(None);

        self.notifier
            .notify(Toast::success(format!("hello {nickname}, you've logged in through github")));

        if let Err(e) = self.storage.set(GITHUB_USER_KEY, &nickname) {
            tracing::warn!(error = %e, "failed to persist nickname");
        }

        tracing::info!(nickname = %nickname, "logged in");
        Ok(profile)
    }

    /// End the session using the configured strategy and clear local state.
    ///
    /// Local session state is cleared even when the remote teardown fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote logout fails. The failure has already
    /// been shown to the user.
    pub async fn logout(&self, client: &ClientHandle) -> Result<(), AuthFlowError> {
        let result = match self.logout {
            LogoutStrategy::Client => match client.client() {
                Some(oauth) => oauth.logout().await,
                None => Err(AuthFlowError::ClientAbsent),
            },
            LogoutStrategy::Redirect => self
                .api
                .logout()
                .await
                .map_err(|e| AuthFlowError::Logout(e.user_message())),
        };

        self.store.clear_session();
        if let Err(e) = self.storage.remove(GITHUB_USER_KEY) {
            tracing::warn!(error = %e, "failed to clear persisted nickname");
        }

        match result {
            Ok(()) => {
                tracing::info!(strategy = ?self.logout, "logged out");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Nickname persisted by the last successful login.
    #[must_use]
    pub fn restore_nickname(&self) -> Option<String> {
        self.storage
            .get(GITHUB_USER_KEY)
            .filter(|n| !n.trim().is_empty())
    }

    fn fail(&self, err: AuthFlowError) -> AuthFlowError {
        tracing::warn!(error = %err, "auth flow failed");
        self.store.error.set(Some(err.to_string()));
        self.notifier.notify(Toast::danger(err.to_string()));
        err
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
