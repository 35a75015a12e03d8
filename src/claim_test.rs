use super::*;

use crate::notify::ToastKind;
use crate::test_helpers::{MockApi, RecordingNotifier, Reply};

const NOW: i64 = 1_700_000_000;
const ADDRESS: &str = "0x1234567890abcdef1234567890ABCDEF12345678";

fn checker(api: Arc<MockApi>) -> (ClaimChecker, Store, Arc<RecordingNotifier>) {
    let store = Store::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let checker = ClaimChecker::new(store.clone(), api, notifier.clone());
    (checker, store, notifier)
}

// =============================================================
// ClaimStatus
// =============================================================

#[test]
fn status_blocked_within_window() {
    let status = ClaimStatus::at(NOW - 1000, NOW);
    assert!(status.blocked);
    assert_eq!(status.remaining, 85_400);
    assert_eq!(status.next_eligible_time, NOW - 1000 + 86_400);
}

#[test]
fn status_open_after_window() {
    let status = ClaimStatus::at(NOW - 90_000, NOW);
    assert!(!status.blocked);
    assert_eq!(status.remaining, 0);
}

#[test]
fn status_open_exactly_at_window_end() {
    let status = ClaimStatus::at(NOW - 86_400, NOW);
    assert!(!status.blocked);
    assert_eq!(status.remaining, 0);
}

// =============================================================
// validate_address
// =============================================================

#[test]
fn address_validation() {
    assert!(validate_address(ADDRESS));
    assert!(!validate_address("0x123"));
    assert!(!validate_address("1234567890abcdef1234567890abcdef1234567890"));
    assert!(!validate_address("0xZZ34567890abcdef1234567890abcdef12345678"));
    assert!(!validate_address(""));
}

// =============================================================
// check
// =============================================================

#[tokio::test]
async fn check_recent_claim_blocks() {
    let api = Arc::new(MockApi::with_last_requested(NOW - 1000));
    let (checker, store, _) = checker(api);

    let status = checker.check_at(Some("octocat"), NOW).await.unwrap().unwrap();

    assert!(status.blocked);
    assert_eq!(status.remaining, 85_400);
    assert!(store.is_token_requested.get());
    assert_eq!(store.last_requested_time.get(), Some(NOW - 1000));
    assert!(store.is_checked.get());
}

#[tokio::test]
async fn check_old_claim_unblocks() {
    let api = Arc::new(MockApi::with_last_requested(NOW - 90_000));
    let (checker, store, _) = checker(api);
    store.is_token_requested.set(true);

    let status = checker.check_at(Some("octocat"), NOW).await.unwrap().unwrap();

    assert!(!status.blocked);
    assert!(!store.is_token_requested.get());
    assert!(store.is_checked.get());
}

#[tokio::test]
async fn check_without_nickname_is_noop() {
    let api = Arc::new(MockApi::with_last_requested(NOW));
    let (checker, store, notifier) = checker(api.clone());

    assert!(checker.check_at(None, NOW).await.unwrap().is_none());
    assert!(checker.check_at(Some("  "), NOW).await.unwrap().is_none());

    assert!(api.calls().is_empty());
    assert!(!store.is_checked.get());
    assert_eq!(store.last_requested_time.get(), None);
    assert!(notifier.toasts().is_empty());
}

#[tokio::test]
async fn check_network_failure_keeps_prior_state() {
    let api = Arc::new(MockApi::new());
    api.set_last_requested(Reply::Offline);
    let (checker, store, notifier) = checker(api);
    store.last_requested_time.set(Some(NOW - 500));
    store.is_token_requested.set(true);

    let err = checker.check_at(Some("octocat"), NOW).await.unwrap_err();

    assert!(matches!(err, ClaimCheckError::Api(ApiError::Request(_))));
    assert_eq!(store.last_requested_time.get(), Some(NOW - 500));
    assert!(store.is_token_requested.get());
    assert!(store.is_checked.get());
    assert_eq!(notifier.messages(ToastKind::Danger), vec!["request failed: connection refused"]);
}

#[tokio::test]
async fn check_status_error_shows_body() {
    let api = Arc::new(MockApi::new());
    api.set_last_requested(Reply::Status(404, "Account not found"));
    let (checker, store, notifier) = checker(api);

    assert!(checker.check_at(Some("ghost"), NOW).await.is_err());

    assert_eq!(store.last_requested_time.get(), None);
    assert!(store.is_checked.get());
    assert_eq!(notifier.messages(ToastKind::Danger), vec!["Account not found"]);
    assert_eq!(store.error.get().as_deref(), Some("Account not found"));
}

#[tokio::test]
async fn check_is_unchecked_while_in_flight() {
    struct SlowApi {
        store: Store,
        seen_checked: std::sync::Mutex<Option<bool>>,
    }

    #[async_trait::async_trait]
    impl FaucetApi for SlowApi {
        async fn last_requested(&self, github: &str) -> Result<crate::api::LastRequest, ApiError> {
            *self.seen_checked.lock().unwrap() = Some(self.store.is_checked.get());
            Ok(crate::api::LastRequest { github: github.to_owned(), last_requested_time: NOW })
        }
        async fn claim(&self, _address: &str) -> Result<String, ApiError> {
            unreachable!()
        }
        async fn info(&self) -> Result<serde_json::Value, ApiError> {
            unreachable!()
        }
        async fn logout(&self) -> Result<(), ApiError> {
            unreachable!()
        }
    }

    let store = Store::new();
    store.is_checked.set(true);
    let api = Arc::new(SlowApi { store: store.clone(), seen_checked: std::sync::Mutex::new(None) });
    let checker = ClaimChecker::new(store.clone(), api.clone(), Arc::new(RecordingNotifier::default()));

    checker.check_at(Some("octocat"), NOW).await.unwrap();

    assert_eq!(*api.seen_checked.lock().unwrap(), Some(false));
    assert!(store.is_checked.get());
}

// =============================================================
// submit
// =============================================================

#[tokio::test]
async fn submit_rejects_bad_address_without_request() {
    let api = Arc::new(MockApi::new());
    let (checker, _, notifier) = checker(api.clone());

    let err = checker.submit_at("0xnope", NOW).await.unwrap_err();

    assert!(matches!(err, ClaimError::InvalidAddress(_)));
    assert!(api.calls().is_empty());
    assert_eq!(notifier.messages(ToastKind::Danger), vec!["invalid address: 0xnope"]);
}

#[tokio::test]
async fn submit_rejects_while_cooling_down() {
    let api = Arc::new(MockApi::new());
    let (checker, store, notifier) = checker(api.clone());
    store.last_requested_time.set(Some(NOW - 1000));
    store.is_token_requested.set(true);

    let err = checker.submit_at(ADDRESS, NOW).await.unwrap_err();

    assert!(matches!(err, ClaimError::CoolingDown { remaining: 85_400 }));
    assert!(api.calls().is_empty());
    assert_eq!(notifier.messages(ToastKind::Danger), vec!["next claim available in 23:43:20"]);
}

#[tokio::test]
async fn submit_success_notifies_response_text() {
    let api = Arc::new(MockApi::new());
    let (checker, _, notifier) = checker(api.clone());

    let text = checker.submit_at(ADDRESS, NOW).await.unwrap();

    assert_eq!(text, "Txhash: 0xabc");
    assert_eq!(api.calls(), vec![format!("claim:{ADDRESS}")]);
    assert_eq!(notifier.messages(ToastKind::Success), vec!["Txhash: 0xabc"]);
}

#[tokio::test]
async fn submit_backend_failure_shows_body() {
    let api = Arc::new(MockApi::new());
    api.set_claim(Reply::Status(503, "Faucet queue is too long, please try again later"));
    let (checker, _, notifier) = checker(api);

    let err = checker.submit_at(ADDRESS, NOW).await.unwrap_err();

    assert!(matches!(err, ClaimError::Api(ApiError::Status { status: 503, .. })));
    assert_eq!(
        notifier.messages(ToastKind::Danger),
        vec!["Faucet queue is too long, please try again later"]
    );
}

#[tokio::test]
async fn submit_error_is_published_then_cleared_on_success() {
    let api = Arc::new(MockApi::new());
    api.set_claim(Reply::Status(500, "Invalid address"));
    let (checker, store, _) = checker(api.clone());

    assert!(checker.submit_at(ADDRESS, NOW).await.is_err());
    assert_eq!(store.error.get().as_deref(), Some("Invalid address"));
    assert!(!store.loading.get());

    api.set_claim(Reply::Ok("Txhash: 0xabc".to_owned()));
    checker.submit_at(ADDRESS, NOW).await.unwrap();
    assert_eq!(store.error.get(), None);
    assert!(!store.loading.get());
}

#[tokio::test]
async fn submit_holds_loading_while_in_flight() {
    struct LoadingAwareApi {
        store: Store,
        seen_loading: std::sync::Mutex<Option<bool>>,
    }

    #[async_trait::async_trait]
    impl FaucetApi for LoadingAwareApi {
        async fn last_requested(&self, _github: &str) -> Result<crate::api::LastRequest, ApiError> {
            unreachable!()
        }
        async fn claim(&self, _address: &str) -> Result<String, ApiError> {
            *self.seen_loading.lock().unwrap() = Some(self.store.loading.get());
            Err(ApiError::Request("connection reset".to_owned()))
        }
        async fn info(&self) -> Result<serde_json::Value, ApiError> {
            unreachable!()
        }
        async fn logout(&self) -> Result<(), ApiError> {
            unreachable!()
        }
    }

    let store = Store::new();
    let api = Arc::new(LoadingAwareApi { store: store.clone(), seen_loading: std::sync::Mutex::new(None) });
    let checker = ClaimChecker::new(store.clone(), api.clone(), Arc::new(RecordingNotifier::default()));

    assert!(checker.submit_at(ADDRESS, NOW).await.is_err());

    assert_eq!(*api.seen_loading.lock().unwrap(), Some(true));
    assert!(!store.loading.get());
}

#[tokio::test]
async fn rejected_submit_never_raises_loading() {
    let api = Arc::new(MockApi::new());
    let (checker, store, _) = checker(api);

    assert!(checker.submit_at("0xnope", NOW).await.is_err());

    assert!(!store.loading.get());
    assert_eq!(store.error.get().as_deref(), Some("invalid address: 0xnope"));
}
