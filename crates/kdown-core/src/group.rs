//! Fixed sets of tasks tracked as one unit.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::DownloadError;
use crate::task::{percentage, Task};

/// How a group settled once every member reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// Every member finished.
    Finished,
    /// Every member is terminal, at least one did not finish.
    Terminated,
}

/// A fixed set of tasks with combined length and progress.
///
/// `finished` and `terminated` are derived from member status on every
/// call; nothing about them is stored except the one-shot `settled` latch
/// that keeps group events from firing twice.
#[derive(Debug)]
pub struct TaskGroup {
    id: i64,
    mark_name: Option<String>,
    tasks: Vec<Arc<Task>>,
    total_length: AtomicU64,
    downloaded: AtomicU64,
    percent: AtomicU8,
    settled: AtomicBool,
}

impl TaskGroup {
    /// Bind `tasks` into a group. Fails if any task already belongs to a
    /// group or the set is empty.
    pub fn new(
        id: i64,
        mark_name: Option<String>,
        tasks: Vec<Arc<Task>>,
    ) -> Result<Arc<TaskGroup>, DownloadError> {
        if tasks.is_empty() {
            return Err(DownloadError::validation("task group has no members"));
        }
        if let Some(t) = tasks.iter().find(|t| t.is_grouped()) {
            return Err(DownloadError::validation(format!(
                "task {} already belongs to a group",
                t.log_name()
            )));
        }

        let group = Arc::new(TaskGroup {
            id,
            mark_name,
            tasks,
            total_length: AtomicU64::new(0),
            downloaded: AtomicU64::new(0),
            percent: AtomicU8::new(0),
            settled: AtomicBool::new(false),
        });
        for t in &group.tasks {
            t.join_group(Arc::downgrade(&group));
            group.add_downloaded(t.downloaded());
            if let Some(len) = t.content_length() {
                t.fold_group_length(len);
            }
        }
        Ok(group)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn mark_name(&self) -> Option<&str> {
        self.mark_name.as_deref()
    }

    pub fn log_name(&self) -> String {
        self.mark_name
            .clone()
            .unwrap_or_else(|| format!("group-{}", self.id))
    }

    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    /// Sum of the probed lengths of members.
    pub fn total_length(&self) -> u64 {
        self.total_length.load(Ordering::Acquire)
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Acquire)
    }

    /// Group percentage; reads 100 only once every member finished.
    pub fn percent(&self) -> u8 {
        if self.is_finished() {
            100
        } else {
            self.percent.load(Ordering::Acquire)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|t| t.status() == crate::task::Status::Finished)
    }

    pub fn is_terminated(&self) -> bool {
        self.tasks.iter().all(|t| t.is_terminated())
    }

    /// Latch the outcome the first time every member is terminal.
    pub(crate) fn settle(&self) -> Option<GroupOutcome> {
        if !self.is_terminated() || self.settled.swap(true, Ordering::AcqRel) {
            return None;
        }
        let outcome = if self.is_finished() {
            GroupOutcome::Finished
        } else {
            GroupOutcome::Terminated
        };
        tracing::info!(group = %self.log_name(), ?outcome, "group settled");
        Some(outcome)
    }

    /// A member was reset or retried; the group may settle again later.
    pub(crate) fn reopen(&self) {
        self.settled.store(false, Ordering::Release);
    }

    pub(crate) fn grow_total(&self, n: u64) {
        self.total_length.fetch_add(n, Ordering::AcqRel);
        self.recompute_percent();
    }

    /// Returns true if the group percentage changed.
    pub(crate) fn add_downloaded(&self, n: u64) -> bool {
        self.downloaded.fetch_add(n, Ordering::AcqRel);
        self.recompute_percent()
    }

    pub(crate) fn sub_downloaded(&self, n: u64) -> bool {
        let _ = self
            .downloaded
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |d| Some(d.saturating_sub(n)));
        self.recompute_percent()
    }

    // Capped at 99: byte totals can reach the sum before the last member's
    // rename, and a member whose probe failed adds bytes with no length.
    fn recompute_percent(&self) -> bool {
        let pct = percentage(self.downloaded(), self.total_length()).min(99);
        self.percent.swap(pct, Ordering::AcqRel) != pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Status;

    fn members(n: usize) -> Vec<Arc<Task>> {
        (0..n)
            .map(|i| Task::builder(format!("http://h/{i}")).name(format!("{i}.bin")).build())
            .collect()
    }

    #[test]
    fn empty_group_rejected() {
        assert!(TaskGroup::new(1, None, vec![]).is_err());
    }

    #[test]
    fn task_cannot_join_two_groups() {
        let tasks = members(2);
        let _g = TaskGroup::new(1, None, tasks.clone()).unwrap();
        let err = TaskGroup::new(2, None, vec![tasks[0].clone()]).unwrap_err();
        assert!(matches!(err, DownloadError::Validation(_)));
    }

    #[test]
    fn lengths_and_bytes_fold_into_group() {
        let tasks = members(3);
        let g = TaskGroup::new(7, Some("iso".into()), tasks.clone()).unwrap();
        tasks[0].set_probe(Some(100), true, None);
        tasks[1].set_probe(Some(200), true, None);
        tasks[2].set_probe(Some(700), true, None);
        assert_eq!(g.total_length(), 1000);

        assert!(tasks[0].advance(100).group_changed);
        tasks[1].advance(150);
        assert_eq!(g.downloaded(), 250);
        assert_eq!(g.percent(), 25);

        // Re-probing the same member only ever adds to the total.
        tasks[2].set_probe(Some(800), true, None);
        assert_eq!(g.total_length(), 1100);
        tasks[2].set_probe(Some(300), true, None);
        assert_eq!(g.total_length(), 1100);
        tasks[2].set_probe(Some(900), true, None);
        assert_eq!(g.total_length(), 1200);
    }

    #[test]
    fn restart_subtracts_member_bytes() {
        let tasks = members(1);
        let g = TaskGroup::new(1, None, tasks.clone()).unwrap();
        tasks[0].set_probe(Some(100), true, None);
        tasks[0].advance(60);
        tasks[0].set_downloaded(0);
        assert_eq!(g.downloaded(), 0);
        assert_eq!(g.percent(), 0);
    }

    #[test]
    fn percent_capped_until_finished() {
        let tasks = members(2);
        let g = TaskGroup::new(1, None, tasks.clone()).unwrap();
        for t in &tasks {
            t.set_probe(Some(10), true, None);
            t.advance(10);
        }
        assert_eq!(g.percent(), 99);
        for t in &tasks {
            t.set_status(Status::Finished);
        }
        assert_eq!(g.percent(), 100);
    }

    #[test]
    fn finished_requires_every_member() {
        let tasks = members(3);
        let g = TaskGroup::new(1, None, tasks.clone()).unwrap();
        tasks[0].set_status(Status::Finished);
        tasks[1].set_status(Status::Finished);
        assert!(!g.is_finished());
        assert!(!g.is_terminated());

        tasks[2].set_status(Status::Cancel);
        assert!(!g.is_finished());
        assert!(g.is_terminated());
    }

    #[test]
    fn mixed_outcome_with_paused_member_is_unsettled() {
        let tasks = members(3);
        let g = TaskGroup::new(1, None, tasks.clone()).unwrap();
        tasks[0].set_status(Status::Finished);
        tasks[1].set_status(Status::Cancel);
        tasks[2].set_status(Status::Paused);
        assert!(!g.is_terminated());
        assert_eq!(g.settle(), None);
    }

    #[test]
    fn settle_fires_once() {
        let tasks = members(2);
        let g = TaskGroup::new(1, None, tasks.clone()).unwrap();
        for t in &tasks {
            t.set_status(Status::Finished);
        }
        assert_eq!(g.settle(), Some(GroupOutcome::Finished));
        assert_eq!(g.settle(), None);

        tasks[1].reset();
        tasks[1].set_status(Status::Failed);
        assert_eq!(g.settle(), Some(GroupOutcome::Terminated));
    }
}
