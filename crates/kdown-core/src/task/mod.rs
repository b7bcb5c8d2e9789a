//! Download task: identity, progress counters and the status state machine.
//!
//! A `Task` is shared as `Arc<Task>` between the caller, the scheduler's
//! registry and the worker running its current attempt. Status lives in an
//! atomic so admission (`try_admit`) is a single compare-and-swap; progress
//! counters are written only by the worker that owns the current attempt.

mod builder;
mod status;

pub use builder::TaskBuilder;
pub use status::Status;

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};
use std::time::{Duration, Instant};

use crate::error::DownloadError;
use crate::group::TaskGroup;
use crate::retry::{self, RetryDecision, RetryPolicy};
use crate::storage;

/// Below this length a resource is never split across connections.
pub const MIN_BLOCK_LENGTH: u64 = 1024 * 1024 * 1024;

/// Connections actually worth opening for a resource: 1 for unknown or
/// small lengths, otherwise one per full block, capped by the request.
pub fn effective_connections(requested: usize, length: Option<u64>) -> usize {
    let requested = crate::config::clamp_connections(requested);
    match length {
        Some(len) if requested > 1 && len >= MIN_BLOCK_LENGTH => {
            let blocks = (len / MIN_BLOCK_LENGTH) as usize;
            blocks.min(requested)
        }
        _ => 1,
    }
}

/// Floor percentage of `done` over `total`, in [0, 100]. Zero when the
/// total is zero.
pub fn percentage(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (done as u128 * 100) / total as u128;
    pct.min(100) as u8
}

/// Which percentages moved after a progress update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Advance {
    pub percent_changed: bool,
    pub group_changed: bool,
}

/// One downloadable resource.
pub struct Task {
    id: i64,
    url: String,
    dest_dir: PathBuf,
    name: RwLock<Option<String>>,
    overwrite: AtomicBool,
    mark_name: Option<String>,
    status: AtomicU8,
    content_length: Mutex<Option<u64>>,
    downloaded: AtomicU64,
    percent: AtomicU8,
    priority: AtomicI32,
    retry_times: u32,
    retries_left: AtomicU32,
    max_connections: usize,
    resumable: AtomicBool,
    etag: Mutex<Option<String>>,
    persisted_id: OnceLock<u64>,
    group: OnceLock<Weak<TaskGroup>>,
    /// Length this task has contributed to its group's total.
    group_length: AtomicU64,
    retry_after: Mutex<Option<Instant>>,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl Task {
    pub fn builder(url: impl Into<String>) -> TaskBuilder {
        TaskBuilder::new(url)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Destination filename, if given or already resolved.
    pub fn name(&self) -> Option<String> {
        self.name.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn set_name(&self, name: String) {
        *self.name.write().unwrap_or_else(|e| e.into_inner()) = Some(name);
    }

    pub fn mark_name(&self) -> Option<&str> {
        self.mark_name.as_deref()
    }

    /// Label for logs: mark name, else filename, else URL.
    pub fn log_name(&self) -> String {
        match (&self.mark_name, self.name()) {
            (Some(m), _) => m.clone(),
            (None, Some(n)) => n,
            (None, None) => self.url.clone(),
        }
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite.load(Ordering::Acquire)
    }

    pub fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn content_length(&self) -> Option<u64> {
        *self.content_length.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Acquire)
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Acquire)
    }

    pub fn priority(&self) -> i32 {
        self.priority.load(Ordering::Acquire)
    }

    /// Takes effect at the next scheduling pass.
    pub fn set_priority(&self, priority: i32) {
        self.priority.store(priority, Ordering::Release);
    }

    pub fn retry_times(&self) -> u32 {
        self.retry_times
    }

    pub fn retries_left(&self) -> u32 {
        self.retries_left.load(Ordering::Acquire)
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn is_resumable(&self) -> bool {
        self.resumable.load(Ordering::Acquire)
    }

    pub fn etag(&self) -> Option<String> {
        self.etag.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn persisted_id(&self) -> Option<u64> {
        self.persisted_id.get().copied()
    }

    /// Returns false if an id was already assigned.
    pub(crate) fn assign_persisted_id(&self, id: u64) -> bool {
        self.persisted_id.set(id).is_ok()
    }

    pub fn group(&self) -> Option<Arc<TaskGroup>> {
        self.group.get().and_then(Weak::upgrade)
    }

    pub(crate) fn join_group(&self, group: Weak<TaskGroup>) -> bool {
        self.group.set(group).is_ok()
    }

    pub(crate) fn is_grouped(&self) -> bool {
        self.group.get().is_some()
    }

    /// Caller payload attached at build time.
    pub fn payload<P: Any + Send + Sync>(&self) -> Option<&P> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<P>())
    }

    pub fn final_path(&self) -> Option<PathBuf> {
        self.name().map(|n| storage::final_path(&self.dest_dir, &n))
    }

    /// True once a backoff delay set by [`Task::failed`] has elapsed.
    pub fn ready_at(&self, now: Instant) -> bool {
        match *self.retry_after.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(at) => now >= at,
            None => true,
        }
    }

    pub(crate) fn retry_delay(&self, now: Instant) -> Option<Duration> {
        self.retry_after
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .and_then(|at| at.checked_duration_since(now))
            .filter(|d| !d.is_zero())
    }

    // ---- status transitions ----

    pub fn is_waiting(&self) -> bool {
        self.status().is_waiting()
    }

    pub fn is_starting(&self) -> bool {
        self.status().is_starting()
    }

    pub fn is_in_queue(&self) -> bool {
        self.status().is_in_queue()
    }

    pub fn is_terminated(&self) -> bool {
        self.status().is_terminated()
    }

    pub fn is_lifecycle_over(&self) -> bool {
        self.status().is_lifecycle_over()
    }

    /// Atomically move a waiting task to `Connecting`. Exactly one of
    /// several concurrent callers wins.
    pub(crate) fn try_admit(&self) -> bool {
        self.transition(Status::Created, Status::Connecting)
            || self.transition(Status::Paused, Status::Connecting)
    }

    /// Compare-and-swap `from` to `to`.
    pub(crate) fn transition(&self, from: Status, to: Status) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn store_status(&self, to: Status) {
        self.status.store(to as u8, Ordering::Release);
    }

    /// Mark `Cancel` and return the status it replaced. Staging files of a
    /// task that is not transferring are deleted now; a running transfer
    /// removes them itself when it sees the flag at the next chunk boundary.
    pub fn cancel(&self) -> Status {
        let prev = Status::from_u8(self.status.swap(Status::Cancel as u8, Ordering::AcqRel));
        tracing::debug!(task = %self.log_name(), from = %prev, "cancel");
        if !prev.is_starting() {
            self.delete_staging();
        }
        prev
    }

    /// Park the task; only an explicit resume makes it eligible again.
    /// No effect once the lifecycle is over.
    pub fn suspend(&self) {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            if Status::from_u8(current).is_lifecycle_over() {
                return;
            }
            match self.status.compare_exchange_weak(
                current,
                Status::Suspend as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Record a failed attempt and decide whether it will be retried.
    ///
    /// Recoverable (network-class) errors consume one unit of the retry
    /// budget and leave the task `Paused` with a backoff deadline; anything
    /// else, or an exhausted budget, leaves it `Failed`. A task cancelled or
    /// suspended while the attempt was failing keeps that status.
    pub fn failed(&self, err: &DownloadError, policy: &RetryPolicy) -> RetryDecision {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            if matches!(Status::from_u8(current), Status::Cancel | Status::Suspend) {
                return RetryDecision::NoRetry;
            }
            match self.status.compare_exchange_weak(
                current,
                Status::Failed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        let remaining = self.retries_left();
        let attempt = self.retry_times.saturating_sub(remaining) + 1;
        let decision = policy.decide(attempt, retry::classify(err), remaining);
        match decision {
            RetryDecision::RetryAfter(delay) => {
                self.retries_left.fetch_sub(1, Ordering::AcqRel);
                *self.retry_after.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some(Instant::now() + delay);
                self.transition(Status::Failed, Status::Paused);
                tracing::warn!(
                    task = %self.log_name(),
                    error = %err,
                    retries_left = remaining - 1,
                    delay_ms = delay.as_millis() as u64,
                    "attempt failed, will retry"
                );
            }
            RetryDecision::NoRetry => {
                tracing::warn!(task = %self.log_name(), error = %err, "attempt failed");
            }
        }
        decision
    }

    /// Start over from byte 0 on the next run, replacing any existing file.
    /// Staged bytes and the sidecar are discarded. Returns false, changing
    /// nothing, while an attempt owns the task.
    pub fn reset(&self) -> bool {
        // Park in Suspend so no admission pass picks the task up half reset.
        if !self.park() {
            return false;
        }
        self.delete_staging();
        self.set_downloaded(0);
        self.retries_left.store(self.retry_times, Ordering::Release);
        self.overwrite.store(true, Ordering::Release);
        *self.retry_after.lock().unwrap_or_else(|e| e.into_inner()) = None;
        let _ = self.transition(Status::Suspend, Status::Created)
            || self.transition(Status::Paused, Status::Created);
        if let Some(g) = self.group() {
            g.reopen();
        }
        tracing::debug!(task = %self.log_name(), status = %self.status(), "reset");
        true
    }

    /// Re-queue a task after a terminal failure, with a fresh retry budget.
    /// Returns false unless the task is `Failed`.
    pub fn retry(&self) -> bool {
        if self.status() != Status::Failed {
            return false;
        }
        self.retries_left.store(self.retry_times, Ordering::Release);
        *self.retry_after.lock().unwrap_or_else(|e| e.into_inner()) = None;
        if !self.transition(Status::Failed, Status::Paused) {
            return false;
        }
        if let Some(g) = self.group() {
            g.reopen();
        }
        true
    }

    /// Move any non-starting status to `Suspend`.
    fn park(&self) -> bool {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            if Status::from_u8(current).is_starting() {
                return false;
            }
            match self.status.compare_exchange_weak(
                current,
                Status::Suspend as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn set_status(&self, to: Status) {
        self.store_status(to);
    }

    // ---- progress ----

    /// Record probe results. A changed length is folded into the group total.
    pub(crate) fn set_probe(&self, length: Option<u64>, resumable: bool, etag: Option<String>) {
        *self.content_length.lock().unwrap_or_else(|e| e.into_inner()) = length;
        self.resumable.store(resumable, Ordering::Release);
        *self.etag.lock().unwrap_or_else(|e| e.into_inner()) = etag;
        if let Some(len) = length {
            self.fold_group_length(len);
        }
        self.recompute_percent();
    }

    /// Contribute `len` to the owning group's total. The total only grows:
    /// a longer re-probe adds the difference, a shorter one changes nothing.
    pub(crate) fn fold_group_length(&self, len: u64) {
        if let Some(g) = self.group() {
            let old = self.group_length.fetch_max(len, Ordering::AcqRel);
            if len > old {
                g.grow_total(len - old);
            }
        }
    }

    /// Set the byte counter to an absolute value (resume offset, restart).
    pub(crate) fn set_downloaded(&self, bytes: u64) -> Advance {
        let old = self.downloaded.swap(bytes, Ordering::AcqRel);
        let group_changed = match self.group() {
            Some(g) if bytes >= old => g.add_downloaded(bytes - old),
            Some(g) => g.sub_downloaded(old - bytes),
            None => false,
        };
        Advance {
            percent_changed: self.recompute_percent(),
            group_changed,
        }
    }

    /// Add `n` freshly written bytes.
    pub(crate) fn advance(&self, n: u64) -> Advance {
        self.downloaded.fetch_add(n, Ordering::AcqRel);
        let group_changed = match self.group() {
            Some(g) => g.add_downloaded(n),
            None => false,
        };
        Advance {
            percent_changed: self.recompute_percent(),
            group_changed,
        }
    }

    fn recompute_percent(&self) -> bool {
        let pct = match self.content_length() {
            Some(len) if len > 0 => percentage(self.downloaded(), len),
            _ => 0,
        };
        self.percent.swap(pct, Ordering::AcqRel) != pct
    }

    /// Remove `<name>.kd` and `<name>.kd.cfg`, if the name is known.
    pub(crate) fn delete_staging(&self) {
        if let Some(name) = self.name() {
            storage::remove_staging(&self.dest_dir, &name);
        }
    }

    /// Resource identity: matching non-empty validator tags, or the same
    /// (URL, directory, filename) triple.
    pub fn same_resource(&self, other: &Task) -> bool {
        if let (Some(a), Some(b)) = (self.etag(), other.etag()) {
            if a == b {
                return true;
            }
        }
        self.url == other.url && self.dest_dir == other.dest_dir && self.name() == other.name()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("persisted_id", &self.persisted_id())
            .field("url", &self.url)
            .field("dest_dir", &self.dest_dir)
            .field("name", &self.name())
            .field("status", &self.status())
            .field("downloaded", &self.downloaded())
            .field("content_length", &self.content_length())
            .field("priority", &self.priority())
            .finish()
    }
}
