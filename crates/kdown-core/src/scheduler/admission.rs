//! The admission pass: pick waiting tasks by priority, claim a connection
//! slot for each, and hand them to blocking workers.

use std::cmp::Reverse;
use std::sync::atomic::Ordering;
use std::sync::{Arc, TryLockError};
use std::time::Instant;

use super::{BudgetGuard, Shared};
use crate::task::Task;
use crate::transfer::{Attempt, BlockingWorker};

/// Stable sort by descending priority; equal priorities keep their order.
pub(super) fn by_priority(tasks: impl Iterator<Item = Arc<Task>>) -> Vec<Arc<Task>> {
    let mut v: Vec<_> = tasks.collect();
    v.sort_by_key(|t| Reverse(t.priority()));
    v
}

impl Shared {
    /// Run an admission pass unless one is already running, in which case
    /// that pass loops once more before returning.
    pub(crate) fn schedule(self: &Arc<Self>) {
        self.rerun.store(true, Ordering::Release);
        loop {
            let guard = match self.pass.try_lock() {
                Ok(g) => g,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            self.rerun.store(false, Ordering::Release);
            self.admit_pass();
            drop(guard);
            if !self.rerun.load(Ordering::Acquire) {
                return;
            }
        }
    }

    fn admit_pass(self: &Arc<Self>) {
        if self.executor.is_queue_paused() {
            return;
        }
        let now = Instant::now();
        let waiting = by_priority(
            self.snapshot()
                .into_iter()
                .filter(|t| t.is_waiting() && t.ready_at(now)),
        );
        for task in waiting {
            let Some(slot) = BudgetGuard::acquire(&self.budget) else {
                tracing::trace!(in_use = self.budget.in_use(), "connection budget exhausted");
                break;
            };
            if !task.try_admit() {
                // Raced with another admitter or a cancel.
                continue;
            }
            tracing::debug!(task = %task.log_name(), priority = task.priority(), "admitted");
            self.spawn_worker(task, slot);
        }
    }

    fn spawn_worker(self: &Arc<Self>, task: Arc<Task>, slot: BudgetGuard) {
        let shared = Arc::clone(self);
        self.runtime.spawn_blocking(move || {
            let attempt = {
                let _worker = BlockingWorker::enter();
                shared.executor.execute(&task, None)
            };
            drop(slot);
            match attempt {
                Attempt::Retry(_, delay) => shared.schedule_after(delay),
                Attempt::Failed(err) => {
                    tracing::warn!(task = %task.log_name(), error = %err, "task failed");
                }
                Attempt::Done(_) => {}
            }
            shared.schedule();
            shared.idle.notify_waiters();
        });
    }

    /// Run another pass once a retry backoff has passed.
    fn schedule_after(self: &Arc<Self>, delay: std::time::Duration) {
        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.schedule();
            shared.idle.notify_waiters();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_is_stable() {
        let mk = |name: &str, p: i32| Task::builder("http://h/x").name(name).priority(p).build();
        let sorted = by_priority(
            vec![mk("a", 0), mk("b", 5), mk("c", 0), mk("d", 5), mk("e", -1)].into_iter(),
        );
        let names: Vec<_> = sorted.iter().map(|t| t.log_name()).collect();
        assert_eq!(names, ["b", "d", "a", "c", "e"]);
    }
}
