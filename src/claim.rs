//! Claim eligibility checks and claim submission.
//!
//! DESIGN
//! ======
//! `ClaimChecker` asks the backend when a nickname last claimed and derives
//! whether the cooldown still blocks a new claim. Every failure is recovered
//! locally: the user gets a danger toast, the message lands in the store's
//! `error` cell, the previous claim state stays as it was, and `is_checked`
//! returns to `true` through a `FlagGuard` no matter how the check exits.
//! `loading` is held while a claim request is in flight.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::api::{ApiError, FaucetApi};
use crate::clock::{self, to_hhmmss};
use crate::notify::{Notifier, Toast};
use crate::state::{FlagGuard, Store};

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^0x[0-9a-fA-F]{40}$").expect("address pattern compiles"));

#[derive(Debug, thiserror::Error)]
pub enum ClaimCheckError {
    #[error("claim status request failed: {0}")]
    Api(#[from] ApiError),
}

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("next claim available in {}", hhmmss(.remaining))]
    CoolingDown { remaining: u64 },
    #[error("claim request failed: {0}")]
    Api(#[from] ApiError),
}

fn hhmmss(remaining: &u64) -> String {
    to_hhmmss(*remaining)
}

/// Claim eligibility derived from the last claim time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimStatus {
    pub last_claim_time: i64,
    pub next_eligible_time: i64,
    /// The cooldown window has not elapsed yet.
    pub blocked: bool,
    /// Seconds until the next claim; zero when not blocked.
    pub remaining: u64,
}

impl ClaimStatus {
    #[must_use]
    pub fn at(last_claim_time: i64, now: i64) -> Self {
        let next_eligible_time = clock::next_eligible_time(last_claim_time);
        let remaining = clock::remaining_secs(next_eligible_time, now);
        Self {
            last_claim_time,
            next_eligible_time,
            blocked: now < next_eligible_time,
            remaining: u64::try_from(remaining).unwrap_or(0),
        }
    }
}

/// Whether `address` looks like a 20-byte hex account address.
#[must_use]
pub fn validate_address(address: &str) -> bool {
    ADDRESS_RE.is_match(address)
}

pub struct ClaimChecker {
    store: Store,
    api: Arc<dyn FaucetApi>,
    notifier: Arc<dyn Notifier>,
}

impl ClaimChecker {
    #[must_use]
    pub fn new(store: Store, api: Arc<dyn FaucetApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, api, notifier }
    }

    /// Check claim eligibility for `nickname` against the current time.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unreachable or answers with a
    /// non-success status. The error has already been shown to the user.
    pub async fn check(&self, nickname: Option<&str>) -> Result<Option<ClaimStatus>, ClaimCheckError> {
        self.check_at(nickname, clock::unix_now()).await
    }

    /// Check claim eligibility for `nickname` as seen from `now`.
    ///
    /// A missing or blank nickname is skipped: no request, no state change,
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// See [`ClaimChecker::check`].
    pub async fn check_at(&self, nickname: Option<&str>, now: i64) -> Result<Option<ClaimStatus>, ClaimCheckError> {
        let Some(nickname) = nickname.map(str::trim).filter(|n| !n.is_empty()) else {
            tracing::debug!("claim check skipped: no nickname");
            return Ok(None);
        };

        let _checked = FlagGuard::hold(&self.store.is_checked, false);
        match self.api.last_requested(nickname).await {
            Ok(last) => {
                let status = ClaimStatus::at(last.last_requested_time, now);
                self.store.last_requested_time.set(Some(status.last_claim_time));
                self.store.is_token_requested.set(status.blocked);
                self.store.error.set(None);
                tracing::info!(
                    nickname,
                    last_claim_time = status.last_claim_time,
                    blocked = status.blocked,
                    remaining = status.remaining,
                    "claim status checked"
                );
                Ok(Some(status))
            }
            Err(e) => {
                tracing::warn!(nickname, error = %e, "claim status check failed");
                self.show_error(e.user_message());
                Err(e.into())
            }
        }
    }

    /// Submit a claim for `address`.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed address, while the cooldown still
    /// blocks claims, or when the backend rejects the request. The error has
    /// already been shown to the user.
    pub async fn submit(&self, address: &str) -> Result<String, ClaimError> {
        self.submit_at(address, clock::unix_now()).await
    }

    /// Submit a claim for `address` as seen from `now`.
    ///
    /// # Errors
    ///
    /// See [`ClaimChecker::submit`].
    pub async fn submit_at(&self, address: &str, now: i64) -> Result<String, ClaimError> {
        let address = address.trim();
        if !validate_address(address) {
            return Err(self.reject(ClaimError::InvalidAddress(address.to_owned())));
        }
        if self.store.is_token_requested.get() {
            let remaining = self
                .store
                .last_requested_time
                .get()
                .map_or(0, |last| ClaimStatus::at(last, now).remaining);
            return Err(self.reject(ClaimError::CoolingDown { remaining }));
        }

        let _loading = FlagGuard::hold(&self.store.loading, true);
        match self.api.claim(address).await {
            Ok(text) => {
                tracing::info!(address, response = %text, "claim accepted");
                self.store.error.set(None);
                self.notifier.notify(Toast::success(text.clone()));
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(address, error = %e, "claim rejected");
                self.show_error(e.user_message());
                Err(e.into())
            }
        }
    }

    fn reject(&self, err: ClaimError) -> ClaimError {
        tracing::warn!(error = %err, "claim not submitted");
        self.show_error(err.to_string());
        err
    }

    fn show_error(&self, message: String) {
        self.store.error.set(Some(message.clone()));
        self.notifier.notify(Toast::danger(message));
    }
}

#[cfg(test)]
#[path = "claim_test.rs"]
mod tests;
