use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct Slot {
    outcome: Mutex<Option<bool>>,
    ready: Condvar,
}

/// Receiving half of a one-shot success/failure signal.
///
/// Returned by every asynchronous [`MediaGraph`](super::MediaGraph)
/// operation. The media state machine blocks on [`wait`](Self::wait) with
/// its transition timeout, so callers never see intermediate graph states.
#[derive(Debug)]
#[must_use = "a completion does nothing unless waited on"]
pub struct Completion {
    slot: Arc<Slot>,
}

/// Sending half of a [`Completion`]. Dropping it unresolved reports failure.
#[derive(Debug)]
pub struct Completer {
    slot: Option<Arc<Slot>>,
}

impl Completion {
    /// Create a connected completer/completion pair.
    pub fn pair() -> (Completer, Completion) {
        let slot = Arc::new(Slot::default());
        (
            Completer {
                slot: Some(slot.clone()),
            },
            Completion { slot },
        )
    }

    /// An already-resolved completion, for operations that finish synchronously.
    pub fn ready(success: bool) -> Self {
        let (completer, completion) = Self::pair();
        completer.complete(success);
        completion
    }

    /// Block until the operation resolves or `timeout` elapses.
    ///
    /// Returns `Some(success)` on resolution and `None` on timeout.
    pub fn wait(self, timeout: Duration) -> Option<bool> {
        let deadline = Instant::now() + timeout;
        let mut outcome = self.slot.outcome.lock();
        while outcome.is_none() {
            if self.slot.ready.wait_until(&mut outcome, deadline).timed_out() {
                break;
            }
        }
        *outcome
    }

    /// Non-blocking check.
    pub fn try_outcome(&self) -> Option<bool> {
        *self.slot.outcome.lock()
    }
}

impl Completer {
    /// Resolve the paired [`Completion`].
    pub fn complete(mut self, success: bool) {
        self.resolve(success);
    }

    fn resolve(&mut self, success: bool) {
        if let Some(slot) = self.slot.take() {
            let mut outcome = slot.outcome.lock();
            if outcome.is_none() {
                *outcome = Some(success);
            }
            slot.ready.notify_all();
        }
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        self.resolve(false);
    }
}
