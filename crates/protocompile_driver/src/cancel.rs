//! Spec.md §5's cooperative cancellation signal: checked at every
//! suspension point (semaphore acquire, dependency wait), never forced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A cheaply-clonable, fireable-once cancellation flag. Every clone
/// observes the same underlying signal.
#[derive(Clone)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelSignal {
    pub fn new() -> Self {
        CancelSignal {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Fires the signal. Idempotent; every task awaiting
    /// [`CancelSignal::cancelled`] wakes, and every later `is_cancelled`
    /// check observes `true`.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the signal has fired, immediately if it already
    /// has. The `Notified` future is constructed before the fired-check
    /// so a `cancel()` racing in between the check and the `.await`
    /// still wakes this waiter — see `tokio::sync::Notify`'s docs on why
    /// the future must be created first.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}
