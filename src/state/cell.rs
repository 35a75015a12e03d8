//! Observable value cells.
//!
//! DESIGN
//! ======
//! Each `Cell` wraps a `tokio::sync::watch` sender. Readers either take a
//! snapshot (`get`), hold a raw receiver (`watch`), or register a callback
//! (`subscribe`). Callbacks see the current value immediately and then run on
//! the next scheduling tick after each change; when several sets land before
//! a subscriber runs, it only observes the latest value.
//!
//! Cells are independent. There is no cross-cell transaction; `combine`
//! builds a derived cell from two sources instead of ambient dependency
//! tracking.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

// =============================================================================
// CELL
// =============================================================================

/// A named, independently observable mutable value.
pub struct Cell<T> {
    name: &'static str,
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self { name: self.name, tx: Arc::clone(&self.tx) }
    }
}

impl<T: fmt::Debug> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("name", &self.name)
            .field("value", &*self.tx.borrow())
            .finish()
    }
}

impl<T> Cell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(name: &'static str, initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { name, tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Snapshot of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value. Subscribers are notified only when it changed.
    ///
    /// Returns `true` when the stored value was different.
    pub fn set(&self, value: T) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        if changed {
            tracing::trace!(cell = self.name, "cell updated");
        }
        changed
    }

    /// Mutate in place. The closure reports whether it changed anything.
    pub fn update(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    /// Raw receiver for async consumers.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Register a callback that runs now with the current value and again
    /// after every later change.
    ///
    /// Must be called from within a tokio runtime. The callback stops when the
    /// returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(&T) + Send + 'static,
    {
        let mut rx = self.tx.subscribe();
        let initial = rx.borrow_and_update().clone();
        callback(&initial);

        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                // Clone out of the channel so the callback may set this cell.
                let value = rx.borrow_and_update().clone();
                callback(&value);
            }
        });
        Subscription { task }
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle for a registered callback. Dropping it stops notifications.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// DERIVED
// =============================================================================

/// A cell recomputed from two source cells by a pure function.
pub struct Derived<T> {
    cell: Cell<T>,
    task: JoinHandle<()>,
}

impl<T> Derived<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    #[must_use]
    pub fn get(&self) -> T {
        self.cell.get()
    }

    #[must_use]
    pub fn cell(&self) -> &Cell<T> {
        &self.cell
    }
}

impl<T> Drop for Derived<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Derive a cell from snapshots of `a` and `b`, recomputed whenever either
/// source changes.
///
/// Must be called from within a tokio runtime.
pub fn combine<A, B, T, F>(name: &'static str, a: &Cell<A>, b: &Cell<B>, f: F) -> Derived<T>
where
    A: Clone + PartialEq + Send + Sync + 'static,
    B: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&A, &B) -> T + Send + 'static,
{
    let mut rx_a = a.watch();
    let mut rx_b = b.watch();
    let initial = {
        let a_now = rx_a.borrow_and_update().clone();
        let b_now = rx_b.borrow_and_update().clone();
        f(&a_now, &b_now)
    };
    let cell = Cell::new(name, initial);
    let out = cell.clone();

    let task = tokio::spawn(async move {
        loop {
            let alive = tokio::select! {
                res = rx_a.changed() => res.is_ok(),
                res = rx_b.changed() => res.is_ok(),
            };
            if !alive {
                break;
            }
            let a_now = rx_a.borrow_and_update().clone();
            let b_now = rx_b.borrow_and_update().clone();
            out.set(f(&a_now, &b_now));
        }
    });

    Derived { cell, task }
}

// =============================================================================
// FLAG GUARD
// =============================================================================

/// Holds a boolean cell at a transient value and restores its resting value
/// on drop, whichever way the owning scope exits.
#[derive(Debug)]
pub struct FlagGuard {
    cell: Cell<bool>,
    resting: bool,
}

impl FlagGuard {
    /// Set `cell` to `value` until the guard is dropped, then to `!value`.
    #[must_use]
    pub fn hold(cell: &Cell<bool>, value: bool) -> Self {
        cell.set(value);
        Self { cell: cell.clone(), resting: !value }
    }

    /// Like [`FlagGuard::hold`], but only when the cell is currently at its
    /// resting value. Returns `None`, leaving the cell alone, when someone
    /// else already holds it.
    #[must_use]
    pub fn try_hold(cell: &Cell<bool>, value: bool) -> Option<Self> {
        let acquired = cell.update(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
        acquired.then(|| Self { cell: cell.clone(), resting: !value })
    }
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.cell.set(self.resting);
    }
}

#[cfg(test)]
#[path = "cell_test.rs"]
mod tests;
