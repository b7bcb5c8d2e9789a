//! Task identity across the process lifetime.
//!
//! The store hands out persisted ids and answers "have we seen this
//! resource before". Only the in-memory store ships here; a durable one
//! plugs in through the same trait.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::task::Task;

/// Swappable history of submitted tasks.
pub trait HistoryStore: Send + Sync {
    /// Record `task` and return its persisted id. A task equal to one
    /// already recorded gets the existing id; ids are never reassigned.
    fn add(&self, task: &Arc<Task>) -> u64;

    /// Persisted id of a recorded task equal to `task`, if any.
    fn find(&self, task: &Task) -> Option<u64>;

    fn get(&self, id: u64) -> Option<Arc<Task>>;

    /// Forget the record equal to `task`. Returns true if one was removed.
    fn delete(&self, task: &Task) -> bool;

    /// Most recently recorded task.
    fn last(&self) -> Option<Arc<Task>>;
}

#[derive(Default)]
struct Records {
    next_id: u64,
    by_id: BTreeMap<u64, Arc<Task>>,
}

impl Records {
    fn lookup(&self, task: &Task) -> Option<u64> {
        if let Some(id) = task.persisted_id() {
            if self.by_id.contains_key(&id) {
                return Some(id);
            }
        }
        self.by_id
            .iter()
            .find(|(_, t)| t.same_resource(task))
            .map(|(id, _)| *id)
    }
}

/// `HistoryStore` kept in process memory.
#[derive(Default)]
pub struct MemoryHistoryStore {
    inner: Mutex<Records>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Records> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn add(&self, task: &Arc<Task>) -> u64 {
        let mut rec = self.records();
        if let Some(id) = rec.lookup(task) {
            task.assign_persisted_id(id);
            return id;
        }
        let id = match task.persisted_id() {
            Some(id) => id,
            None => {
                rec.next_id += 1;
                let id = rec.next_id;
                task.assign_persisted_id(id);
                id
            }
        };
        rec.next_id = rec.next_id.max(id);
        rec.by_id.insert(id, Arc::clone(task));
        tracing::debug!(task = %task.log_name(), id, "recorded in history");
        id
    }

    fn find(&self, task: &Task) -> Option<u64> {
        self.records().lookup(task)
    }

    fn get(&self, id: u64) -> Option<Arc<Task>> {
        self.records().by_id.get(&id).cloned()
    }

    fn delete(&self, task: &Task) -> bool {
        let mut rec = self.records();
        match rec.lookup(task) {
            Some(id) => rec.by_id.remove(&id).is_some(),
            None => false,
        }
    }

    fn last(&self) -> Option<Arc<Task>> {
        self.records().by_id.values().next_back().cloned()
    }
}
