//! Fan-out of task and group events.
//!
//! Each event goes to the global listener first, then to the per-call
//! [`EventBundle`] if the caller supplied one. Group events reach the global
//! listener only through [`DownloadListener::as_group_listener`]. The
//! terminate event of a grouped task is where the group is checked for
//! settlement, so group finish/terminate always follow the member event
//! that caused them.

mod bundle;
mod gate;
mod listener;

pub use bundle::EventBundle;
pub use gate::ProgressGate;
pub use listener::{DownloadListener, GroupListener};

use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::DownloadError;
use crate::group::{GroupOutcome, TaskGroup};
use crate::task::Task;

/// Dispatcher shared by the scheduler and its workers.
#[derive(Default)]
pub struct EventSink {
    listener: RwLock<Option<Arc<dyn DownloadListener>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the global listener.
    pub fn set_listener(&self, listener: Option<Arc<dyn DownloadListener>>) {
        *self.listener.write().unwrap_or_else(|e| e.into_inner()) = listener;
    }

    fn global(&self) -> Option<Arc<dyn DownloadListener>> {
        self.listener.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn start(&self, task: &Arc<Task>, bundle: Option<&EventBundle>) {
        if let Some(l) = self.global() {
            l.on_start(task);
        }
        if let Some(f) = bundle.and_then(|b| b.start.as_ref()) {
            f(task);
        }
    }

    pub fn progress(&self, task: &Arc<Task>, percent: u8, bundle: Option<&EventBundle>) {
        if let Some(l) = self.global() {
            l.on_progress(task, percent);
        }
        if let Some(f) = bundle.and_then(|b| b.progress.as_ref()) {
            f(task, percent);
        }
    }

    pub fn pause(&self, task: &Arc<Task>, bundle: Option<&EventBundle>) {
        if let Some(l) = self.global() {
            l.on_pause(task);
        }
        if let Some(f) = bundle.and_then(|b| b.pause.as_ref()) {
            f(task);
        }
    }

    pub fn finish(&self, task: &Arc<Task>, path: &Path, bundle: Option<&EventBundle>) {
        if let Some(l) = self.global() {
            l.on_finish(task, path);
        }
        if let Some(f) = bundle.and_then(|b| b.finish.as_ref()) {
            f(task, path);
        }
    }

    pub fn fail(
        &self,
        task: &Arc<Task>,
        err: &DownloadError,
        will_retry: bool,
        bundle: Option<&EventBundle>,
    ) {
        if let Some(l) = self.global() {
            l.on_fail(task, err, will_retry);
        }
        if let Some(f) = bundle.and_then(|b| b.fail.as_ref()) {
            f(task, err, will_retry);
        }
    }

    /// Terminate event, then the group settlement check for grouped tasks.
    pub fn terminate(&self, task: &Arc<Task>, bundle: Option<&EventBundle>) {
        if let Some(l) = self.global() {
            l.on_terminate(task);
        }
        if let Some(f) = bundle.and_then(|b| b.terminate.as_ref()) {
            f(task);
        }
        if let Some(group) = task.group() {
            self.settle_group(&group, bundle);
        }
    }

    pub fn group_progress(&self, group: &Arc<TaskGroup>, percent: u8, bundle: Option<&EventBundle>) {
        if let Some(l) = self.global() {
            if let Some(gl) = l.as_group_listener() {
                gl.on_group_progress(group, percent);
            }
        }
        if let Some(f) = bundle.and_then(|b| b.group_progress.as_ref()) {
            f(group, percent);
        }
    }

    fn settle_group(&self, group: &Arc<TaskGroup>, bundle: Option<&EventBundle>) {
        let Some(outcome) = group.settle() else {
            return;
        };
        let global = self.global();
        let gl = global.as_deref().and_then(|l| l.as_group_listener());
        if outcome == GroupOutcome::Finished {
            if let Some(gl) = gl {
                gl.on_group_progress(group, 100);
                gl.on_group_finish(group);
            }
            if let Some(b) = bundle {
                if let Some(f) = &b.group_progress {
                    f(group, 100);
                }
                if let Some(f) = &b.group_finish {
                    f(group);
                }
            }
        }
        if let Some(gl) = gl {
            gl.on_group_terminate(group);
        }
        if let Some(f) = bundle.and_then(|b| b.group_terminate.as_ref()) {
            f(group);
        }
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("listener", &self.global().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Status;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
        groups: bool,
    }

    impl Recorder {
        fn push(&self, s: String) {
            self.log.lock().unwrap().push(s);
        }
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.log.lock().unwrap())
        }
    }

    impl DownloadListener for Recorder {
        fn on_start(&self, t: &Arc<Task>) {
            self.push(format!("start {}", t.log_name()));
        }
        fn on_terminate(&self, t: &Arc<Task>) {
            self.push(format!("terminate {}", t.log_name()));
        }
        fn as_group_listener(&self) -> Option<&dyn GroupListener> {
            self.groups.then_some(self as &dyn GroupListener)
        }
    }

    impl GroupListener for Recorder {
        fn on_group_progress(&self, g: &Arc<TaskGroup>, p: u8) {
            self.push(format!("group-progress {} {p}", g.id()));
        }
        fn on_group_finish(&self, g: &Arc<TaskGroup>) {
            self.push(format!("group-finish {}", g.id()));
        }
        fn on_group_terminate(&self, g: &Arc<TaskGroup>) {
            self.push(format!("group-terminate {}", g.id()));
        }
    }

    fn grouped(n: usize) -> (Arc<TaskGroup>, Vec<Arc<Task>>) {
        let tasks: Vec<_> = (0..n)
            .map(|i| Task::builder(format!("http://h/{i}")).name(format!("t{i}")).build())
            .collect();
        (TaskGroup::new(9, None, tasks.clone()).unwrap(), tasks)
    }

    #[test]
    fn global_then_bundle() {
        let sink = EventSink::new();
        let rec = Arc::new(Recorder::default());
        sink.set_listener(Some(rec.clone()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s2 = seen.clone();
        let bundle = EventBundle::new().on_start(move |t| s2.lock().unwrap().push(t.log_name()));

        let t = Task::builder("http://h/x").name("x").build();
        sink.start(&t, Some(&bundle));
        assert_eq!(rec.take(), ["start x"]);
        assert_eq!(*seen.lock().unwrap(), ["x"]);
    }

    #[test]
    fn group_events_need_group_capable_listener() {
        let sink = EventSink::new();
        let rec = Arc::new(Recorder::default());
        sink.set_listener(Some(rec.clone()));
        let (_g, tasks) = grouped(1);
        tasks[0].set_status(Status::Finished);
        sink.terminate(&tasks[0], None);
        assert_eq!(rec.take(), ["terminate t0"]);
    }

    #[test]
    fn group_settles_after_last_member() {
        let sink = EventSink::new();
        let rec = Arc::new(Recorder {
            groups: true,
            ..Recorder::default()
        });
        sink.set_listener(Some(rec.clone()));
        let (_g, tasks) = grouped(2);

        tasks[0].set_status(Status::Finished);
        sink.terminate(&tasks[0], None);
        assert_eq!(rec.take(), ["terminate t0"]);

        tasks[1].set_status(Status::Finished);
        sink.terminate(&tasks[1], None);
        assert_eq!(
            rec.take(),
            [
                "terminate t1",
                "group-progress 9 100",
                "group-finish 9",
                "group-terminate 9"
            ]
        );

        // A second terminate on a settled group does not re-fire.
        sink.terminate(&tasks[1], None);
        assert_eq!(rec.take(), ["terminate t1"]);
    }

    #[test]
    fn mixed_outcome_terminates_without_finish() {
        let sink = EventSink::new();
        let rec = Arc::new(Recorder {
            groups: true,
            ..Recorder::default()
        });
        sink.set_listener(Some(rec.clone()));
        let (_g, tasks) = grouped(2);
        tasks[0].set_status(Status::Finished);
        tasks[1].set_status(Status::Cancel);
        sink.terminate(&tasks[1], None);
        assert_eq!(rec.take(), ["terminate t1", "group-terminate 9"]);
    }

    #[test]
    fn bundle_group_closures_fire_without_listener() {
        let sink = EventSink::new();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let (h1, h2) = (hits.clone(), hits.clone());
        let bundle = EventBundle::new()
            .on_group_finish(move |g| h1.lock().unwrap().push(format!("finish {}", g.id())))
            .on_group_terminate(move |g| h2.lock().unwrap().push(format!("terminate {}", g.id())));
        let (_g, tasks) = grouped(1);
        tasks[0].set_status(Status::Finished);
        sink.terminate(&tasks[0], Some(&bundle));
        assert_eq!(*hits.lock().unwrap(), ["finish 9", "terminate 9"]);
    }
}
