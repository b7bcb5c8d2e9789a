//! Bridge from an application lifecycle (process start, Ctrl-C, a UI's
//! foreground/background) to queue control.

use crate::scheduler::Scheduler;

/// Something that reacts to the embedding application starting and stopping.
pub trait LifecycleHook: Send + Sync {
    fn on_start(&self);
    fn on_stop(&self);
}

impl LifecycleHook for Scheduler {
    /// Start admitting queued tasks.
    fn on_start(&self) {
        tracing::debug!("lifecycle start");
        self.start_task_queue();
    }

    /// Stop admitting and pause running transfers at their next chunk.
    fn on_stop(&self) {
        tracing::debug!("lifecycle stop");
        self.stop_task_queue();
    }
}
