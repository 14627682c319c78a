//! Process-wide transfer suspension.
//!
//! Archive servers answer overload with a suspension directive: pause
//! all transfer activity for a given number of seconds. One
//! [`SuspensionCoordinator`] instance is shared by every component that
//! issues network calls; operations arriving during the cooldown are
//! parked FIFO and replayed once it elapses.
//!
//! The coordinator is an injected component owned by the composition
//! root, never a global, so tests construct independent instances.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use blobwire_core::SuspensionState;

/// Coordinates the process-wide transfer cooldown.
///
/// Clones share state.
#[derive(Clone)]
pub struct SuspensionCoordinator {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    state: SuspensionState<Instant>,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl SuspensionCoordinator {
    /// Create a coordinator in the active state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: SuspensionState::new(),
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Whether transfers are currently paused.
    pub fn is_suspended(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.state.is_suspended(Instant::now())
    }

    /// Arm the cooldown window and schedule its expiry.
    ///
    /// Idempotent while a window is running: only the first signal arms
    /// the timer; later signals neither shorten nor extend it.
    pub fn activate_if_inactive(&self, wait: Duration) {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        if inner.state.signal(now, now + wait) {
            tracing::warn!(seconds = wait.as_secs(), "transfer suspension armed");
            let shared = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(wait).await;
                resume(&shared);
            });
        }
    }

    /// Park until the coordinator is active.
    ///
    /// Returns immediately when no window is running. Parked operations
    /// are woken in arrival order when the cooldown elapses; each one
    /// re-checks the state, so it is parked again if a new window was
    /// armed while earlier operations were already running.
    pub async fn wait_until_active(&self) {
        loop {
            let parked = {
                let mut inner = self.inner.lock().unwrap();
                if !inner.state.is_suspended(Instant::now()) {
                    return;
                }
                let (tx, rx) = oneshot::channel();
                inner.waiters.push_back(tx);
                rx
            };
            // a dropped sender also wakes us; the loop re-checks the state
            let _ = parked.await;
        }
    }

    /// Number of operations currently parked.
    pub fn deferred_len(&self) -> usize {
        self.inner.lock().unwrap().waiters.len()
    }
}

fn resume(shared: &Arc<Mutex<Inner>>) {
    let woken = {
        let mut inner = shared.lock().unwrap();
        if !inner.state.resume_if_elapsed(Instant::now()) {
            // stray timer from an earlier window; the live one fires later
            return;
        }
        inner.waiters.drain(..).collect::<Vec<_>>()
    };
    tracing::debug!(
        waiters = woken.len(),
        "suspension window elapsed, replaying deferred operations"
    );
    for waiter in woken {
        let _ = waiter.send(());
    }
}

impl Default for SuspensionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn active_coordinator_does_not_block() {
        let coordinator = SuspensionCoordinator::new();
        assert!(!coordinator.is_suspended());
        coordinator.wait_until_active().await;
    }

    #[tokio::test(start_paused = true)]
    async fn suspension_parks_and_replays() {
        let coordinator = SuspensionCoordinator::new();
        coordinator.activate_if_inactive(Duration::from_secs(2));
        assert!(coordinator.is_suspended());

        coordinator.wait_until_active().await;

        assert!(!coordinator.is_suspended());
    }

    #[tokio::test(start_paused = true)]
    async fn second_signal_does_not_extend_window() {
        let coordinator = SuspensionCoordinator::new();
        coordinator.activate_if_inactive(Duration::from_secs(2));
        coordinator.activate_if_inactive(Duration::from_secs(600));

        let start = Instant::now();
        coordinator.wait_until_active().await;

        assert!(Instant::now() - start <= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_replay_in_arrival_order() {
        let coordinator = SuspensionCoordinator::new();
        coordinator.activate_if_inactive(Duration::from_secs(1));

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = Vec::new();
        for index in 0..3 {
            let coordinator = coordinator.clone();
            let order = Arc::clone(&order);
            tasks.push(tokio::spawn(async move {
                coordinator.wait_until_active().await;
                order.lock().unwrap().push(index);
            }));
            // let the task park before spawning the next one
            tokio::task::yield_now().await;
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn woken_waiter_is_parked_again_by_new_window() {
        let coordinator = SuspensionCoordinator::new();
        coordinator.activate_if_inactive(Duration::from_secs(1));

        let resumed = Arc::new(AtomicUsize::new(0));
        let waiter = {
            let coordinator = coordinator.clone();
            let resumed = Arc::clone(&resumed);
            tokio::spawn(async move {
                coordinator.wait_until_active().await;
                // first window over; a second one arms before we run again
                coordinator.activate_if_inactive(Duration::from_secs(5));
                coordinator.wait_until_active().await;
                resumed.store(1, Ordering::SeqCst);
            })
        };

        waiter.await.unwrap();
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_suspended());
    }
}
