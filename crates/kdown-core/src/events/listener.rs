use std::path::Path;
use std::sync::Arc;

use crate::error::DownloadError;
use crate::group::TaskGroup;
use crate::task::Task;

/// Lifecycle callbacks for tasks. Every method defaults to a no-op.
///
/// Callbacks run on the worker thread that drives the transfer; keep them
/// short.
pub trait DownloadListener: Send + Sync {
    fn on_start(&self, _task: &Arc<Task>) {}

    fn on_progress(&self, _task: &Arc<Task>, _percent: u8) {}

    /// Stopped cooperatively (queue stopped or task suspended).
    fn on_pause(&self, _task: &Arc<Task>) {}

    fn on_finish(&self, _task: &Arc<Task>, _path: &Path) {}

    /// `will_retry` is true when the failure consumed a retry and the task
    /// went back to the queue.
    fn on_fail(&self, _task: &Arc<Task>, _err: &DownloadError, _will_retry: bool) {}

    /// Fires after every attempt, whatever the outcome.
    fn on_terminate(&self, _task: &Arc<Task>) {}

    /// Listeners that also want group events return `Some(self)`.
    fn as_group_listener(&self) -> Option<&dyn GroupListener> {
        None
    }
}

/// Group callbacks, reached through [`DownloadListener::as_group_listener`].
pub trait GroupListener: Send + Sync {
    fn on_group_progress(&self, _group: &Arc<TaskGroup>, _percent: u8) {}

    fn on_group_finish(&self, _group: &Arc<TaskGroup>) {}

    /// Every member is terminal; fires after `on_group_finish` when all
    /// members finished.
    fn on_group_terminate(&self, _group: &Arc<TaskGroup>) {}
}
