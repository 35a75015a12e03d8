//! Faucet session orchestration.
//!
//! DESIGN
//! ======
//! `Faucet` wires the pieces together the way a page session would: log in,
//! look up when the user last claimed, keep the countdown running while the
//! cooldown blocks a new claim, and tear everything down on logout. All
//! state lands in the shared `Store`; callers subscribe to its cells.

use std::sync::Arc;

use crate::api::FaucetApi;
use crate::auth::{AuthBridge, AuthFlowError, ClientHandle, LoginOptions};
use crate::claim::{ClaimCheckError, ClaimChecker, ClaimError, ClaimStatus};
use crate::clock::{self, Countdown};
use crate::config::LogoutStrategy;
use crate::notify::Notifier;
use crate::state::{Store, UserProfile};
use crate::storage::KeyValueStore;

pub struct Faucet {
    store: Store,
    countdown: Countdown,
    claims: ClaimChecker,
    bridge: AuthBridge,
}

impl Faucet {
    #[must_use]
    pub fn new(
        api: Arc<dyn FaucetApi>,
        notifier: Arc<dyn Notifier>,
        storage: Arc<dyn KeyValueStore>,
        logout: LogoutStrategy,
    ) -> Self {
        let store = Store::new();
        Self {
            countdown: Countdown::new(store.clone()),
            claims: ClaimChecker::new(store.clone(), api.clone(), notifier.clone()),
            bridge: AuthBridge::new(store.clone(), notifier, storage, api, logout),
            store,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn bridge(&self) -> &AuthBridge {
        &self.bridge
    }

    /// Nickname of the current session, falling back to the one persisted by
    /// the last login.
    #[must_use]
    pub fn nickname(&self) -> Option<String> {
        self.store
            .github_user
            .get()
            .nickname()
            .map(str::to_owned)
            .or_else(|| self.bridge.restore_nickname())
    }

    /// Log in and load the claim status for the new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the login flow fails. A failed status check after
    /// a successful login is logged and does not fail the login.
    pub async fn login(&self, client: &ClientHandle, options: LoginOptions) -> Result<UserProfile, AuthFlowError> {
        let profile = self.bridge.login_with_popup(client, options).await?;
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "claim status unavailable after login");
        }
        Ok(profile)
    }

    /// Re-check claim eligibility and start or stop the countdown to match.
    ///
    /// # Errors
    ///
    /// Returns an error if the status request fails.
    pub async fn refresh(&self) -> Result<Option<ClaimStatus>, ClaimCheckError> {
        self.refresh_at(clock::unix_now()).await
    }

    /// [`Faucet::refresh`] as seen from `now`.
    ///
    /// # Errors
    ///
    /// See [`Faucet::refresh`].
    pub async fn refresh_at(&self, now: i64) -> Result<Option<ClaimStatus>, ClaimCheckError> {
        let nickname = self.nickname();
        let status = self.claims.check_at(nickname.as_deref(), now).await?;
        if let Some(status) = status {
            let last = status.blocked.then_some(status.last_claim_time);
            self.handle_request_time_at(last, now);
        }
        Ok(status)
    }

    /// Start counting down from `last_claim_time`, or stop and clear the timer
    /// when there is none.
    pub fn handle_request_time(&self, last_claim_time: Option<i64>) {
        self.handle_request_time_at(last_claim_time, clock::unix_now());
    }

    /// [`Faucet::handle_request_time`] as seen from `now`.
    pub fn handle_request_time_at(&self, last_claim_time: Option<i64>, now: i64) {
        match last_claim_time {
            Some(last) => self.countdown.start_at(clock::next_eligible_time(last), now),
            None => self.countdown.stop(),
        }
    }

    /// Submit a claim, then reload the status so the countdown starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the claim is refused locally or by the backend.
    pub async fn claim(&self, address: &str) -> Result<String, ClaimError> {
        let text = self.claims.submit(address).await?;
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "claim status unavailable after claim");
        }
        Ok(text)
    }

    /// Stop the countdown and end the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote logout fails. Local state is cleared
    /// regardless.
    pub async fn logout(&self, client: &ClientHandle) -> Result<(), AuthFlowError> {
        self.countdown.cancel();
        self.bridge.logout(client).await
    }

    #[must_use]
    pub fn countdown_active(&self) -> bool {
        self.countdown.is_active()
    }

    pub fn shutdown(&self) {
        self.countdown.cancel();
        tracing::debug!("faucet session shut down");
    }
}

#[cfg(test)]
#[path = "app_test.rs"]
mod tests;
