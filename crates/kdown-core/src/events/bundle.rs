use std::path::Path;
use std::sync::Arc;

use crate::error::DownloadError;
use crate::group::TaskGroup;
use crate::task::Task;

type TaskFn = Box<dyn Fn(&Arc<Task>) + Send + Sync>;
type ProgressFn = Box<dyn Fn(&Arc<Task>, u8) + Send + Sync>;
type FinishFn = Box<dyn Fn(&Arc<Task>, &Path) + Send + Sync>;
type FailFn = Box<dyn Fn(&Arc<Task>, &DownloadError, bool) + Send + Sync>;
type GroupFn = Box<dyn Fn(&Arc<TaskGroup>) + Send + Sync>;
type GroupProgressFn = Box<dyn Fn(&Arc<TaskGroup>, u8) + Send + Sync>;

/// Closures for one download call, fired after the global listener.
#[derive(Default)]
pub struct EventBundle {
    pub(crate) start: Option<TaskFn>,
    pub(crate) progress: Option<ProgressFn>,
    pub(crate) pause: Option<TaskFn>,
    pub(crate) finish: Option<FinishFn>,
    pub(crate) fail: Option<FailFn>,
    pub(crate) terminate: Option<TaskFn>,
    pub(crate) group_progress: Option<GroupProgressFn>,
    pub(crate) group_finish: Option<GroupFn>,
    pub(crate) group_terminate: Option<GroupFn>,
}

impl EventBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl Fn(&Arc<Task>) + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl Fn(&Arc<Task>, u8) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn on_pause(mut self, f: impl Fn(&Arc<Task>) + Send + Sync + 'static) -> Self {
        self.pause = Some(Box::new(f));
        self
    }

    pub fn on_finish(mut self, f: impl Fn(&Arc<Task>, &Path) + Send + Sync + 'static) -> Self {
        self.finish = Some(Box::new(f));
        self
    }

    pub fn on_fail(
        mut self,
        f: impl Fn(&Arc<Task>, &DownloadError, bool) + Send + Sync + 'static,
    ) -> Self {
        self.fail = Some(Box::new(f));
        self
    }

    pub fn on_terminate(mut self, f: impl Fn(&Arc<Task>) + Send + Sync + 'static) -> Self {
        self.terminate = Some(Box::new(f));
        self
    }

    pub fn on_group_progress(
        mut self,
        f: impl Fn(&Arc<TaskGroup>, u8) + Send + Sync + 'static,
    ) -> Self {
        self.group_progress = Some(Box::new(f));
        self
    }

    pub fn on_group_finish(mut self, f: impl Fn(&Arc<TaskGroup>) + Send + Sync + 'static) -> Self {
        self.group_finish = Some(Box::new(f));
        self
    }

    pub fn on_group_terminate(
        mut self,
        f: impl Fn(&Arc<TaskGroup>) + Send + Sync + 'static,
    ) -> Self {
        self.group_terminate = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for EventBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBundle")
            .field("start", &self.start.is_some())
            .field("progress", &self.progress.is_some())
            .field("finish", &self.finish.is_some())
            .field("fail", &self.fail.is_some())
            .finish_non_exhaustive()
    }
}
