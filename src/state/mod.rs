//! Shared client-side state.
//!
//! DESIGN
//! ======
//! `Store` is the explicit state context: built once at startup and handed
//! to every component that reads or writes session, claim, or countdown
//! state. Cloning a `Store` clones handles, not values, so all clones observe
//! the same cells.

pub mod cell;
pub mod models;

pub use cell::{Cell, Derived, FlagGuard, Subscription, combine};
pub use models::{Task, User, UserProfile, user_tasks};

/// Named cells the UI observes.
#[derive(Clone, Debug)]
pub struct Store {
    pub is_authenticated: Cell<bool>,
    pub is_github_auth: Cell<bool>,
    /// An interactive login window is open.
    pub popup_open: Cell<bool>,
    pub github_user: Cell<UserProfile>,
    pub user: Cell<Option<User>>,
    /// A claim happened within the cooldown window, so a new one is blocked.
    pub is_token_requested: Cell<bool>,
    /// The last claim-status check has completed.
    pub is_checked: Cell<bool>,
    /// Unix seconds of the last claim, as reported by the backend.
    pub last_requested_time: Cell<Option<i64>>,
    /// Formatted `HH:MM:SS` until the next claim; empty when not counting down.
    pub timer: Cell<String>,
    pub countdown_active: Cell<bool>,
    /// Message of the last failed claim or login; cleared on the next success.
    pub error: Cell<Option<String>>,
    pub tasks: Cell<Vec<Task>>,
    /// A claim request is in flight.
    pub loading: Cell<bool>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_authenticated: Cell::new("is_authenticated", false),
            is_github_auth: Cell::new("is_github_auth", false),
            popup_open: Cell::new("popup_open", false),
            github_user: Cell::new("github_user", UserProfile::default()),
            user: Cell::new("user", None),
            is_token_requested: Cell::new("is_token_requested", false),
            is_checked: Cell::new("is_checked", false),
            last_requested_time: Cell::new("last_requested_time", None),
            timer: Cell::new("timer", String::new()),
            countdown_active: Cell::new("countdown_active", false),
            error: Cell::new("error", None),
            tasks: Cell::new("tasks", Vec::new()),
            loading: Cell::new("loading", false),
        }
    }

    /// Tasks belonging to the current user, kept in sync with `tasks` and
    /// `user`. Must be called from within a tokio runtime.
    #[must_use]
    pub fn user_tasks(&self) -> Derived<Vec<Task>> {
        combine("user_tasks", &self.tasks, &self.user, |tasks: &Vec<Task>, user: &Option<User>| {
            user_tasks(tasks, user.as_ref())
        })
    }

    /// Reset identity and claim cells after logout.
    pub fn clear_session(&self) {
        self.is_authenticated.set(false);
        self.is_github_auth.set(false);
        self.github_user.set(UserProfile::default());
        self.user.set(None);
        self.is_token_requested.set(false);
        self.last_requested_time.set(None);
        self.timer.set(String::new());
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
