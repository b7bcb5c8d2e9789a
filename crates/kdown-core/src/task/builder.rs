//! Fluent construction of [`Task`]s.

use std::any::Any;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, AtomicU8};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use super::{Status, Task};
use crate::config::clamp_connections;

const DEFAULT_RETRY_TIMES: u32 = 3;

/// Builder returned by [`Task::builder`].
pub struct TaskBuilder {
    url: String,
    id: i64,
    dest_dir: PathBuf,
    name: Option<String>,
    overwrite: bool,
    priority: i32,
    retry_times: u32,
    max_connections: usize,
    mark_name: Option<String>,
    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl TaskBuilder {
    pub(super) fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            id: 0,
            dest_dir: PathBuf::from("."),
            name: None,
            overwrite: false,
            priority: 0,
            retry_times: DEFAULT_RETRY_TIMES,
            max_connections: 1,
            mark_name: None,
            payload: None,
        }
    }

    /// Caller-chosen id, not interpreted by the engine.
    pub fn id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn dest_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dest_dir = dir.into();
        self
    }

    /// Destination filename. Derived from the URL at execution time when unset.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace an existing file at the destination instead of failing.
    pub fn overwrite(mut self, yes: bool) -> Self {
        self.overwrite = yes;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Auto-retry budget for recoverable failures.
    pub fn retry_times(mut self, n: u32) -> Self {
        self.retry_times = n;
        self
    }

    /// Requested connections, clamped to [1, 20].
    pub fn max_connections(mut self, n: usize) -> Self {
        self.max_connections = clamp_connections(n);
        self
    }

    /// Human label for logs and progress output.
    pub fn mark_name(mut self, label: impl Into<String>) -> Self {
        self.mark_name = Some(label.into());
        self
    }

    /// Opaque caller data carried with the task and handed back in events.
    pub fn payload<P: Any + Send + Sync>(mut self, payload: P) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    pub fn build(self) -> Arc<Task> {
        Arc::new(Task {
            id: self.id,
            url: self.url,
            dest_dir: self.dest_dir,
            name: RwLock::new(self.name),
            overwrite: AtomicBool::new(self.overwrite),
            mark_name: self.mark_name,
            status: AtomicU8::new(Status::Created as u8),
            content_length: Mutex::new(None),
            downloaded: AtomicU64::new(0),
            percent: AtomicU8::new(0),
            priority: AtomicI32::new(self.priority),
            retry_times: self.retry_times,
            retries_left: AtomicU32::new(self.retry_times),
            max_connections: self.max_connections,
            resumable: AtomicBool::new(false),
            etag: Mutex::new(None),
            persisted_id: OnceLock::new(),
            group: OnceLock::new(),
            group_length: AtomicU64::new(0),
            retry_after: Mutex::new(None),
            payload: self.payload,
        })
    }
}
