//! Transient user-facing notifications.
//!
//! `Notifier` is fire-and-forget: callers never wait on or inspect the
//! result. The CLI renders toasts through `tracing`; a UI shell would plug in
//! its own toast widget behind the same trait.

use std::time::Duration;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Danger,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToastPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub duration: Duration,
    pub position: ToastPosition,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
            duration: DEFAULT_TOAST_DURATION,
            position: ToastPosition::default(),
        }
    }

    #[must_use]
    pub fn danger(message: impl Into<String>) -> Self {
        Self { kind: ToastKind::Danger, ..Self::success(message) }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Renders toasts as log lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        let duration_ms = u64::try_from(toast.duration.as_millis()).unwrap_or(u64::MAX);
        match toast.kind {
            ToastKind::Success => tracing::info!(duration_ms, "{}", toast.message),
            ToastKind::Danger => tracing::warn!(duration_ms, "{}", toast.message),
        }
    }
}
