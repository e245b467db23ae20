//! Trailing-edge debouncer.
//!
//! Collapses a burst of triggers into a single execution after a quiescent
//! interval. Only the most recently scheduled action may run; actions are
//! never executed concurrently.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

/// Debouncer with a fixed delay.
///
/// `run` re-arms the timer; the action fires once the delay has elapsed
/// with no further `run` call. If the timer fires while a previous action
/// is still running, the new action waits for it to finish.
pub struct Debouncer {
    delay: Duration,
    /// Bumped on every run/stop; a timer only fires if it is still current.
    generation: Arc<AtomicU64>,
    /// Serializes action execution across timer tasks.
    gate: Arc<Mutex<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Schedule `action` to run after the delay, cancelling any pending
    /// execution from earlier calls.
    pub fn run<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let armed = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let gate = Arc::clone(&self.gate);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if generation.load(Ordering::SeqCst) != armed {
                return; // superseded by a later run or stop
            }

            let _serialized = gate.lock().await;
            if generation.load(Ordering::SeqCst) != armed {
                return; // superseded while waiting on a running action
            }

            action().await;
        });
    }

    /// Cancel any pending execution. A running action is left to finish.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
