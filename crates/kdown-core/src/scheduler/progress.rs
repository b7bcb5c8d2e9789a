//! Display-oriented progress snapshots (rate, ETA).

use std::time::Duration;

use crate::group::TaskGroup;
use crate::task::Task;

/// Progress of a task or group at one instant.
#[derive(Debug, Clone)]
pub struct ProgressStats {
    pub bytes_done: u64,
    /// `None` while the length is unknown.
    pub total_bytes: Option<u64>,
    pub percent: u8,
    /// Time since the attempt (or group) started.
    pub elapsed: Duration,
}

impl ProgressStats {
    pub fn for_task(task: &Task, elapsed: Duration) -> Self {
        Self {
            bytes_done: task.downloaded(),
            total_bytes: task.content_length(),
            percent: task.percent(),
            elapsed,
        }
    }

    pub fn for_group(group: &TaskGroup, elapsed: Duration) -> Self {
        let total = group.total_length();
        Self {
            bytes_done: group.downloaded(),
            total_bytes: (total > 0).then_some(total),
            percent: group.percent(),
            elapsed,
        }
    }

    /// Average rate over `elapsed`; 0 before any time has passed.
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / secs
    }

    /// Seconds left at the average rate. `None` without a length or rate.
    pub fn eta_secs(&self) -> Option<f64> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        (rate > 0.0).then(|| remaining as f64 / rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(done: u64, total: Option<u64>, secs: u64) -> ProgressStats {
        ProgressStats {
            bytes_done: done,
            total_bytes: total,
            percent: 0,
            elapsed: Duration::from_secs(secs),
        }
    }

    #[test]
    fn rate_and_eta() {
        let s = stats(500, Some(1500), 5);
        assert!((s.bytes_per_sec() - 100.0).abs() < 1e-9);
        assert!((s.eta_secs().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn eta_unknown_without_length_or_time() {
        assert_eq!(stats(10, None, 5).eta_secs(), None);
        assert_eq!(stats(0, Some(10), 0).eta_secs(), None);
        assert_eq!(stats(10, Some(10), 0).eta_secs(), Some(0.0));
    }

    #[test]
    fn snapshot_of_task() {
        let t = Task::builder("http://h/f").build();
        t.set_probe(Some(200), true, None);
        t.advance(50);
        let s = ProgressStats::for_task(&t, Duration::from_secs(1));
        assert_eq!(s.bytes_done, 50);
        assert_eq!(s.total_bytes, Some(200));
        assert_eq!(s.percent, 25);
    }
}
