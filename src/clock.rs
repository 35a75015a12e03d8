//! Claim cooldown clock.
//!
//! DESIGN
//! ======
//! `Countdown` owns at most one ticking task. The task recomputes the
//! remaining time once per second against a monotonic deadline (fixed when
//! the countdown starts) and publishes `HH:MM:SS` into the store. On the tick
//! that reaches zero it flips the claim-blocked flag back and exits on its
//! own. Starting again cancels the previous task first, and dropping the
//! `Countdown` cancels whatever is still running. Store writes from the task
//! happen under the same lock as start and cancel, so a retired task can
//! never overwrite a newer countdown.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::state::Store;

/// Seconds between two claims.
pub const COOLDOWN_SECS: i64 = 60 * 60 * 24;

const TICK: Duration = Duration::from_secs(1);

/// Format seconds as `HH:MM:SS`. Hours are not wrapped at 24 or 99.
#[must_use]
pub fn to_hhmmss(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[must_use]
pub fn next_eligible_time(last_claim_time: i64) -> i64 {
    last_claim_time.saturating_add(COOLDOWN_SECS)
}

#[must_use]
pub fn remaining_secs(next_eligible_time: i64, now: i64) -> i64 {
    next_eligible_time.saturating_sub(now)
}

/// Current wall-clock time in unix seconds.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

// =============================================================================
// COUNTDOWN
// =============================================================================

struct Ticker {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Ticker {
    fn stop(self) {
        self.token.cancel();
        self.task.abort();
    }
}

/// Ticker bookkeeping shared with the running task. Every start or cancel
/// bumps `generation`; a task only writes to the store while holding this
/// lock and while its own generation is still current.
#[derive(Default)]
struct TickerSlot {
    generation: u64,
    ticker: Option<Ticker>,
}

impl TickerSlot {
    fn retire(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.ticker.take() {
            Some(ticker) => {
                ticker.stop();
                true
            }
            None => false,
        }
    }
}

type SharedSlot = Arc<Mutex<TickerSlot>>;

fn lock(slot: &Mutex<TickerSlot>) -> MutexGuard<'_, TickerSlot> {
    slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Repeating once-per-second countdown toward the next eligible claim.
pub struct Countdown {
    store: Store,
    slot: SharedSlot,
}

impl Countdown {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store, slot: Arc::default() }
    }

    /// Count down toward `next_eligible` (unix seconds) from the current time.
    pub fn start(&self, next_eligible: i64) {
        self.start_at(next_eligible, unix_now());
    }

    /// Count down toward `next_eligible` as seen from `now`.
    ///
    /// Any running countdown is cancelled first. Must be called from within a
    /// tokio runtime when the deadline is still in the future.
    pub fn start_at(&self, next_eligible: i64, now: i64) {
        let mut slot = lock(&self.slot);
        slot.retire();

        let remaining = remaining_secs(next_eligible, now);
        if remaining <= 0 {
            expire(&self.store);
            return;
        }
        let remaining = remaining.unsigned_abs();
        publish(&self.store, remaining);
        self.store.countdown_active.set(true);

        let deadline = Instant::now() + Duration::from_secs(remaining);
        let token = CancellationToken::new();
        let task = tokio::spawn(run_ticker(
            self.store.clone(),
            Arc::clone(&self.slot),
            slot.generation,
            deadline,
            token.clone(),
        ));
        slot.ticker = Some(Ticker { token, task });
        tracing::debug!(remaining, "countdown started");
    }

    /// Stop ticking. No-op when nothing is running. The last published
    /// timer value is left in place.
    pub fn cancel(&self) {
        let mut slot = lock(&self.slot);
        if slot.retire() {
            tracing::debug!("countdown cancelled");
        }
        self.store.countdown_active.set(false);
    }

    /// Stop ticking and unblock claims: inactive, empty timer.
    pub fn stop(&self) {
        let mut slot = lock(&self.slot);
        if slot.retire() {
            tracing::debug!("countdown stopped");
        }
        expire(&self.store);
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        lock(&self.slot)
            .ticker
            .as_ref()
            .is_some_and(|t| !t.task.is_finished())
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        lock(&self.slot).retire();
    }
}

async fn run_ticker(store: Store, slot: SharedSlot, generation: u64, deadline: Instant, token: CancellationToken) {
    let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => return,
            _ = interval.tick() => {
                if !tick(&store, &slot, generation, deadline) {
                    return;
                }
            }
        }
    }
}

/// One countdown step. Returns `false` once the ticker should exit, either
/// because the deadline passed or because a newer start or cancel retired
/// this generation.
fn tick(store: &Store, slot: &Mutex<TickerSlot>, generation: u64, deadline: Instant) -> bool {
    let slot = lock(slot);
    if slot.generation != generation {
        return false;
    }
    let remaining = whole_secs(deadline.saturating_duration_since(Instant::now()));
    if remaining == 0 {
        expire(store);
        tracing::info!("claim cooldown elapsed");
        return false;
    }
    publish(store, remaining);
    true
}

/// Round to the nearest second so a slightly late tick does not skip a value.
fn whole_secs(d: Duration) -> u64 {
    u64::try_from(d.as_millis().saturating_add(500) / 1000).unwrap_or(u64::MAX)
}

fn publish(store: &Store, remaining: u64) {
    store.timer.set(to_hhmmss(remaining));
    store.is_token_requested.set(true);
}

fn expire(store: &Store) {
    store.is_token_requested.set(false);
    store.countdown_active.set(false);
    store.timer.set(String::new());
}

#[cfg(test)]
#[path = "clock_test.rs"]
mod tests;
