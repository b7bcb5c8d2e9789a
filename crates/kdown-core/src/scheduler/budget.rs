//! Connection budget shared by every queued transfer.
//!
//! A slot is reserved before a task is moved to `Connecting` and released
//! only after the task has left `Connecting`/`Running`, so the number of
//! starting tasks never exceeds the budget even while the admission pass
//! and finishing workers race.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::clamp_connections;

#[derive(Debug)]
pub struct GlobalConnectionBudget {
    max_total: AtomicUsize,
    in_use: AtomicUsize,
}

impl GlobalConnectionBudget {
    /// `max_total` is clamped to [1, 20].
    pub fn new(max_total: usize) -> Self {
        Self {
            max_total: AtomicUsize::new(clamp_connections(max_total)),
            in_use: AtomicUsize::new(0),
        }
    }

    pub fn max_total(&self) -> usize {
        self.max_total.load(Ordering::Acquire)
    }

    /// Change the limit. Slots already held above a lowered limit drain
    /// naturally; no new ones are handed out until usage drops below it.
    pub fn set_max_total(&self, max_total: usize) {
        self.max_total
            .store(clamp_connections(max_total), Ordering::Release);
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    pub fn available(&self) -> usize {
        self.max_total().saturating_sub(self.in_use())
    }

    /// Reserve up to `requested` slots; returns how many were taken.
    pub fn reserve(&self, requested: usize) -> usize {
        let mut current = self.in_use.load(Ordering::Acquire);
        loop {
            let take = requested.min(self.max_total().saturating_sub(current));
            if take == 0 {
                return 0;
            }
            match self.in_use.compare_exchange_weak(
                current,
                current + take,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return take,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn release(&self, n: usize) {
        let _ = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |u| Some(u.saturating_sub(n)));
    }
}

/// One reserved slot, returned to the budget on drop.
#[derive(Debug)]
pub struct BudgetGuard {
    budget: Arc<GlobalConnectionBudget>,
}

impl BudgetGuard {
    /// Take one slot, or `None` when the budget is exhausted.
    pub fn acquire(budget: &Arc<GlobalConnectionBudget>) -> Option<Self> {
        (budget.reserve(1) == 1).then(|| Self {
            budget: Arc::clone(budget),
        })
    }
}

impl Drop for BudgetGuard {
    fn drop(&mut self) {
        self.budget.release(1);
    }
}
