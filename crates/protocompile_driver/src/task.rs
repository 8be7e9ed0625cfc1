//! Spec.md §4.1's "task": a single-shot completion channel any number of
//! dependents may await, keyed in the driver's task map by path so a
//! diamond-shaped import graph still builds each file exactly once.

use std::sync::{Arc, Mutex};

use protocompile_diag::CompileError;
use protocompile_ir::File;
use tokio::sync::Notify;

/// The outcome a [`TaskSlot`] eventually settles to.
pub type TaskResult = Result<Arc<File>, CompileError>;

/// A completion slot: one producer calls [`TaskSlot::complete`] exactly
/// once; any number of consumers call [`TaskSlot::wait`] to observe the
/// same result, whether they started waiting before or after completion.
pub struct TaskSlot {
    result: Mutex<Option<TaskResult>>,
    notify: Notify,
}

impl TaskSlot {
    pub fn new() -> Self {
        TaskSlot {
            result: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Publishes this task's result and wakes every waiter. Calling this
    /// more than once would silently drop the second result — the
    /// driver's task map guarantees exactly one producer per path, so
    /// this is never exercised in practice, but is not itself what
    /// enforces that guarantee.
    pub fn complete(&self, result: TaskResult) {
        *self.result.lock().expect("task slot mutex poisoned") = Some(result);
        self.notify.notify_waiters();
    }

    pub fn is_complete(&self) -> bool {
        self.result.lock().expect("task slot mutex poisoned").is_some()
    }

    /// Resolves once [`TaskSlot::complete`] has been called, returning a
    /// clone of its result. The `Notified` future must be constructed
    /// before re-checking the result so a `complete()` racing in between
    /// the check and the `.await` is never missed.
    pub async fn wait(&self) -> TaskResult {
        loop {
            let notified = self.notify.notified();
            if let Some(result) = self.result.lock().expect("task slot mutex poisoned").clone() {
                return result;
            }
            notified.await;
        }
    }
}

impl Default for TaskSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocompile_diag::CompileError;

    #[tokio::test]
    async fn wait_resolves_immediately_once_already_complete() {
        let slot = TaskSlot::new();
        slot.complete(Err(CompileError::Cancelled));
        let result = slot.wait().await;
        assert!(matches!(result, Err(CompileError::Cancelled)));
    }

    #[tokio::test]
    async fn wait_wakes_a_waiter_parked_before_completion() {
        let slot = Arc::new(TaskSlot::new());
        let waiter = slot.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });
        tokio::task::yield_now().await;
        slot.complete(Err(CompileError::Cancelled));
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(CompileError::Cancelled)));
    }

    #[test]
    fn fresh_slot_is_not_complete() {
        let slot = TaskSlot::new();
        assert!(!slot.is_complete());
    }
}
