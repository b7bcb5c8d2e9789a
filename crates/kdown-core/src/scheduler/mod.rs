//! Task registry and admission control.
//!
//! The scheduler owns the registry of queued tasks and a connection budget.
//! Every state change that can free or need capacity (add, start, a worker
//! finishing, a retry backoff expiring) runs an admission pass, which moves
//! the highest-priority waiting tasks to `Connecting` and hands each to a
//! blocking worker.

mod admission;
mod budget;
mod direct;
mod group;
mod progress;

pub use budget::{BudgetGuard, GlobalConnectionBudget};
pub use progress::ProgressStats;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};

use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::config::KdownConfig;
use crate::error::DownloadError;
use crate::events::{DownloadListener, EventSink};
use crate::group::TaskGroup;
use crate::history::{HistoryStore, MemoryHistoryStore};
use crate::task::{Status, Task};
use crate::transfer::TransferExecutor;
use crate::transport::{CurlTransport, HttpTransport};

pub(crate) struct Shared {
    registry: RwLock<Vec<Arc<Task>>>,
    groups: RwLock<Vec<Arc<TaskGroup>>>,
    history: Arc<dyn HistoryStore>,
    executor: Arc<TransferExecutor>,
    budget: Arc<GlobalConnectionBudget>,
    /// Held for the duration of one admission pass.
    pass: Mutex<()>,
    /// Another pass was requested while one was running.
    rerun: AtomicBool,
    runtime: Handle,
    idle: Notify,
}

/// Download queue with bounded concurrency. Cheap to clone; clones share
/// the same registry.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

/// Builder for [`Scheduler`].
pub struct SchedulerBuilder {
    cfg: KdownConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    history: Option<Arc<dyn HistoryStore>>,
    listener: Option<Arc<dyn DownloadListener>>,
    runtime: Option<Handle>,
}

impl SchedulerBuilder {
    /// Replace the libcurl transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the in-memory history store.
    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn DownloadListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Runtime for workers and timers. Defaults to the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<Scheduler, DownloadError> {
        let runtime = match self.runtime {
            Some(h) => h,
            None => Handle::try_current().map_err(|_| {
                DownloadError::validation("Scheduler needs a tokio runtime; build it inside one or pass a handle")
            })?,
        };
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(CurlTransport::new(self.cfg.http_or_default())));
        let events = Arc::new(EventSink::new());
        events.set_listener(self.listener);
        let executor = Arc::new(TransferExecutor::new(transport, events, &self.cfg));

        tracing::debug!(
            max_connections = self.cfg.effective_max_connections(),
            progress = ?self.cfg.progress_mode,
            "scheduler ready"
        );
        Ok(Scheduler {
            shared: Arc::new(Shared {
                registry: RwLock::new(Vec::new()),
                groups: RwLock::new(Vec::new()),
                history: self
                    .history
                    .unwrap_or_else(|| Arc::new(MemoryHistoryStore::new())),
                executor,
                budget: Arc::new(GlobalConnectionBudget::new(
                    self.cfg.effective_max_connections(),
                )),
                pass: Mutex::new(()),
                rerun: AtomicBool::new(false),
                runtime,
                idle: Notify::new(),
            }),
        })
    }
}

impl Scheduler {
    pub fn builder(cfg: KdownConfig) -> SchedulerBuilder {
        SchedulerBuilder {
            cfg,
            transport: None,
            history: None,
            listener: None,
            runtime: None,
        }
    }

    /// Scheduler on the current tokio runtime with default collaborators.
    pub fn new(cfg: KdownConfig) -> Result<Scheduler, DownloadError> {
        Self::builder(cfg).build()
    }

    pub fn set_listener(&self, listener: Option<Arc<dyn DownloadListener>>) {
        self.shared.executor.events().set_listener(listener);
    }

    pub fn executor(&self) -> &Arc<TransferExecutor> {
        &self.shared.executor
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.shared.history
    }

    pub fn max_connections(&self) -> usize {
        self.shared.budget.max_total()
    }

    /// Change the concurrency limit (clamped to [1, 20]) and fill any new
    /// capacity.
    pub fn set_max_connections(&self, n: usize) {
        self.shared.budget.set_max_total(n);
        self.shared.schedule();
    }

    /// Register a task without starting anything. Returns false, and logs,
    /// when an equal task is already queued.
    pub fn add_task(&self, task: Arc<Task>) -> bool {
        self.shared.add(task)
    }

    /// Register a task and start the queue.
    pub fn add_task_and_start(&self, task: Arc<Task>) -> bool {
        let added = self.add_task(task);
        self.start_task_queue();
        added
    }

    /// Drop a task from the registry, suspending it first if it is
    /// transferring. Staged files stay on disk.
    pub fn remove_task(&self, task: &Arc<Task>) -> bool {
        if task.is_starting() {
            task.suspend();
        }
        let removed = self.shared.remove(task);
        self.shared.idle.notify_waiters();
        removed
    }

    /// Cancel a task and drop it from the registry. A running transfer
    /// reports its own termination; anything else terminates here, which
    /// also settles its group.
    pub fn cancel_task(&self, task: &Arc<Task>) -> bool {
        let prev = task.cancel();
        if !prev.is_starting() && !prev.is_terminated() {
            self.shared.executor.events().terminate(task, None);
        }
        let removed = self.shared.remove(task);
        self.shared.idle.notify_waiters();
        removed
    }

    /// Make a suspended task eligible again and run an admission pass.
    pub fn resume_task(&self, task: &Arc<Task>) -> bool {
        let resumed = task.transition(Status::Suspend, Status::Paused);
        if resumed {
            tracing::debug!(task = %task.log_name(), "resumed");
            self.shared.schedule();
        }
        resumed
    }

    /// Clear the global stop flag and admit waiting tasks.
    pub fn start_task_queue(&self) {
        self.shared.executor.set_queue_paused(false);
        self.shared.schedule();
    }

    /// Set the global stop flag. Nothing new is admitted and running
    /// transfers pause at their next chunk boundary.
    pub fn stop_task_queue(&self) {
        self.shared.executor.set_queue_paused(true);
        tracing::info!("task queue stopped");
        self.shared.idle.notify_waiters();
    }

    pub fn is_queue_stopped(&self) -> bool {
        self.shared.executor.is_queue_paused()
    }

    /// Snapshot of the registry in insertion order.
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        self.shared.snapshot()
    }

    /// Tasks in `Connecting` or `Running`.
    pub fn running_tasks(&self) -> Vec<Arc<Task>> {
        self.shared
            .snapshot()
            .into_iter()
            .filter(|t| t.is_starting())
            .collect()
    }

    /// Waiting tasks, highest priority first, ties in insertion order.
    pub fn waiting_tasks(&self) -> Vec<Arc<Task>> {
        admission::by_priority(self.shared.snapshot().into_iter().filter(|t| t.is_waiting()))
    }

    /// Drop finished, failed and cancelled tasks from the registry.
    pub fn purge_terminated(&self) -> usize {
        let mut reg = self.shared.registry.write().unwrap_or_else(|e| e.into_inner());
        let before = reg.len();
        reg.retain(|t| !t.is_terminated());
        before - reg.len()
    }

    /// Resolve once nothing is transferring and nothing more will be
    /// admitted: the queue is stopped or holds no waiting task.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.shared.snapshot().len())
            .field("budget", &self.shared.budget)
            .field("stopped", &self.is_queue_stopped())
            .finish()
    }
}

impl Shared {
    fn snapshot(&self) -> Vec<Arc<Task>> {
        self.registry.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn add(&self, task: Arc<Task>) -> bool {
        let mut reg = self.registry.write().unwrap_or_else(|e| e.into_inner());
        if reg
            .iter()
            .any(|t| Arc::ptr_eq(t, &task) || t.same_resource(&task))
        {
            tracing::warn!(task = %task.log_name(), "duplicate task not added");
            return false;
        }
        let id = self.history.add(&task);
        tracing::debug!(task = %task.log_name(), id, priority = task.priority(), "task added");
        reg.push(task);
        true
    }

    fn remove(&self, task: &Arc<Task>) -> bool {
        let mut reg = self.registry.write().unwrap_or_else(|e| e.into_inner());
        let before = reg.len();
        reg.retain(|t| !Arc::ptr_eq(t, task));
        before != reg.len()
    }

    fn is_idle(&self) -> bool {
        let tasks = self.snapshot();
        if self.budget.in_use() > 0 || tasks.iter().any(|t| t.is_starting()) {
            return false;
        }
        self.executor.is_queue_paused() || !tasks.iter().any(|t| t.is_waiting())
    }
}
