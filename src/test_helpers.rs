//! Shared mocks for unit tests.

use std::sync::Mutex;

use crate::api::{ApiError, FaucetApi, LastRequest};
use crate::auth::{AuthFlowError, LoginOptions, OAuthClient};
use crate::notify::{Notifier, Toast, ToastKind};
use crate::state::UserProfile;

// =============================================================================
// API
// =============================================================================

/// Scripted backend answer.
#[derive(Clone, Debug)]
pub enum Reply<T> {
    Ok(T),
    Status(u16, &'static str),
    Offline,
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<T, ApiError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Status(status, body) => Err(ApiError::Status { status, body: body.to_owned() }),
            Self::Offline => Err(ApiError::Request("connection refused".to_owned())),
        }
    }
}

pub struct MockApi {
    pub last_requested: Mutex<Reply<i64>>,
    pub claim: Mutex<Reply<String>>,
    pub logout: Mutex<Reply<()>>,
    calls: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            last_requested: Mutex::new(Reply::Status(404, "Account not found")),
            claim: Mutex::new(Reply::Ok("Txhash: 0xabc".to_owned())),
            logout: Mutex::new(Reply::Ok(())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_last_requested(time: i64) -> Self {
        let api = Self::new();
        api.set_last_requested(Reply::Ok(time));
        api
    }

    pub fn set_last_requested(&self, reply: Reply<i64>) {
        *self.last_requested.lock().unwrap() = reply;
    }

    pub fn set_claim(&self, reply: Reply<String>) {
        *self.claim.lock().unwrap() = reply;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl FaucetApi for MockApi {
    async fn last_requested(&self, github: &str) -> Result<LastRequest, ApiError> {
        self.record(format!("requested:{github}"));
        let reply = self.last_requested.lock().unwrap().clone();
        reply
            .into_result()
            .map(|last_requested_time| LastRequest { github: github.to_owned(), last_requested_time })
    }

    async fn claim(&self, address: &str) -> Result<String, ApiError> {
        self.record(format!("claim:{address}"));
        let reply = self.claim.lock().unwrap().clone();
        reply.into_result()
    }

    async fn info(&self) -> Result<serde_json::Value, ApiError> {
        self.record("info".to_owned());
        Ok(serde_json::json!({}))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.record("logout".to_owned());
        let reply = self.logout.lock().unwrap().clone();
        reply.into_result()
    }
}

// =============================================================================
// NOTIFIER
// =============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }

    pub fn messages(&self, kind: ToastKind) -> Vec<String> {
        self.toasts()
            .into_iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}

// =============================================================================
// OAUTH
// =============================================================================

#[derive(Clone, Copy, Debug)]
pub enum LoginOutcome {
    Succeed,
    Cancel,
    Reject(&'static str),
}

pub struct MockOAuth {
    pub outcome: Mutex<LoginOutcome>,
    pub profile: Mutex<Option<UserProfile>>,
    logged_in: Mutex<bool>,
    logouts: Mutex<u32>,
}

impl MockOAuth {
    pub fn new(outcome: LoginOutcome, nickname: Option<&str>) -> Self {
        let profile = nickname.map(|n| UserProfile {
            nickname: Some(n.to_owned()),
            name: Some(format!("{n} display")),
            sub: Some(format!("github|{n}")),
            ..UserProfile::default()
        });
        Self {
            outcome: Mutex::new(outcome),
            profile: Mutex::new(profile),
            logged_in: Mutex::new(false),
            logouts: Mutex::new(0),
        }
    }

    pub fn logouts(&self) -> u32 {
        *self.logouts.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl OAuthClient for MockOAuth {
    async fn login_with_popup(&self, _options: &LoginOptions) -> Result<(), AuthFlowError> {
        tokio::task::yield_now().await;
        let outcome = *self.outcome.lock().unwrap();
        match outcome {
            LoginOutcome::Succeed => {
                *self.logged_in.lock().unwrap() = true;
                Ok(())
            }
            LoginOutcome::Cancel => Err(AuthFlowError::Cancelled),
            LoginOutcome::Reject(msg) => Err(AuthFlowError::Rejected(msg.to_owned())),
        }
    }

    async fn get_user(&self) -> Result<Option<UserProfile>, AuthFlowError> {
        if !*self.logged_in.lock().unwrap() {
            return Ok(None);
        }
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn logout(&self) -> Result<(), AuthFlowError> {
        *self.logged_in.lock().unwrap() = false;
        *self.logouts.lock().unwrap() += 1;
        Ok(())
    }
}
