//! Group registration: bind members, probe their lengths, queue them.

use std::sync::Arc;

use super::Scheduler;
use crate::error::DownloadError;
use crate::group::TaskGroup;
use crate::task::Task;
use crate::transfer::BlockingWorker;

impl Scheduler {
    /// Bind `tasks` into a new group known to this scheduler. Members are
    /// not queued; see [`Scheduler::add_task_group`].
    pub fn create_task_group(
        &self,
        mark_name: Option<String>,
        tasks: Vec<Arc<Task>>,
    ) -> Result<Arc<TaskGroup>, DownloadError> {
        let mut groups = self.shared.groups.write().unwrap_or_else(|e| e.into_inner());
        let id = groups.iter().map(|g| g.id()).max().unwrap_or(0) + 1;
        let group = TaskGroup::new(id, mark_name, tasks)?;
        tracing::debug!(group = %group.log_name(), members = group.tasks().len(), "group created");
        groups.push(Arc::clone(&group));
        Ok(group)
    }

    /// Probe every member's length concurrently, then register the members.
    /// A member whose probe fails contributes no length until its own
    /// transfer probes successfully. Returns how many members were added.
    pub async fn add_task_group(&self, group: &Arc<TaskGroup>) -> usize {
        let probes: Vec<_> = group
            .tasks()
            .iter()
            .filter(|t| t.content_length().is_none())
            .map(|t| {
                let task = Arc::clone(t);
                let executor = Arc::clone(self.executor());
                self.shared.runtime.spawn_blocking(move || {
                    let _worker = BlockingWorker::enter();
                    let probed = executor.probe(task.url());
                    (task, probed)
                })
            })
            .collect();

        for handle in probes {
            match handle.await {
                Ok((task, Ok(p))) => {
                    tracing::debug!(task = %task.log_name(), length = ?p.content_length, "member probed");
                    task.set_probe(p.content_length, p.resumable, p.etag);
                }
                Ok((task, Err(err))) => {
                    tracing::warn!(task = %task.log_name(), error = %err, "member probe failed; length unknown");
                }
                Err(err) => tracing::warn!(error = %err, "member probe worker died"),
            }
        }
        tracing::info!(
            group = %group.log_name(),
            total = group.total_length(),
            "group length probed"
        );

        group
            .tasks()
            .iter()
            .filter(|t| self.add_task(Arc::clone(t)))
            .count()
    }

    /// [`Scheduler::add_task_group`], then start the queue.
    pub async fn add_task_group_and_start(&self, group: &Arc<TaskGroup>) -> usize {
        let added = self.add_task_group(group).await;
        self.start_task_queue();
        added
    }

    pub fn groups(&self) -> Vec<Arc<TaskGroup>> {
        self.shared.groups.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
