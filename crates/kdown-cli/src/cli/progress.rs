//! Line-oriented progress output for `kdown get`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use kdown_core::{DownloadError, DownloadListener, GroupListener, ProgressStats, Task, TaskGroup};

const MIB: f64 = 1_048_576.0;

/// Prints one line per event. Rate and ETA are averaged from the start of
/// the current attempt.
#[derive(Default)]
pub struct ConsoleListener {
    started: Mutex<HashMap<String, Instant>>,
    group_started: Mutex<Option<Instant>>,
}

impl ConsoleListener {
    pub fn new() -> Self {
        Self::default()
    }

    fn elapsed(&self, key: &str) -> std::time::Duration {
        self.started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .map(|t| t.elapsed())
            .unwrap_or_default()
    }
}

pub fn format_stats(label: &str, stats: &ProgressStats) -> String {
    let done = stats.bytes_done as f64 / MIB;
    let total = stats
        .total_bytes
        .map(|t| format!("{:.1}", t as f64 / MIB))
        .unwrap_or_else(|| "?".to_string());
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    format!(
        "{}  {:>3}%  {:.1} / {} MiB  {:.2} MiB/s  ETA {}",
        label,
        stats.percent,
        done,
        total,
        stats.bytes_per_sec() / MIB,
        eta
    )
}

impl DownloadListener for ConsoleListener {
    fn on_start(&self, task: &Arc<Task>) {
        self.started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(task.log_name(), Instant::now());
        self.group_started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_or_insert_with(Instant::now);
    }

    fn on_progress(&self, task: &Arc<Task>, _percent: u8) {
        let name = task.log_name();
        let stats = ProgressStats::for_task(task, self.elapsed(&name));
        println!("{}", format_stats(&name, &stats));
    }

    fn on_pause(&self, task: &Arc<Task>) {
        println!("{}  paused at {} bytes", task.log_name(), task.downloaded());
    }

    fn on_finish(&self, task: &Arc<Task>, path: &Path) {
        println!("{}  done -> {}", task.log_name(), path.display());
    }

    fn on_fail(&self, task: &Arc<Task>, err: &DownloadError, will_retry: bool) {
        if will_retry {
            println!("{}  error: {} (retrying, {} left)", task.log_name(), err, task.retries_left());
        } else {
            println!("{}  failed: {}", task.log_name(), err);
        }
    }

    fn as_group_listener(&self) -> Option<&dyn GroupListener> {
        Some(self)
    }
}

impl GroupListener for ConsoleListener {
    fn on_group_progress(&self, group: &Arc<TaskGroup>, _percent: u8) {
        let started = *self.group_started.lock().unwrap_or_else(|e| e.into_inner());
        let elapsed = started.map(|t| t.elapsed()).unwrap_or_default();
        let stats = ProgressStats::for_group(group, elapsed);
        println!("[{}]", format_stats(&group.log_name(), &stats));
    }

    fn on_group_finish(&self, group: &Arc<TaskGroup>) {
        println!("[{}]  all {} files done", group.log_name(), group.tasks().len());
    }

    fn on_group_terminate(&self, group: &Arc<TaskGroup>) {
        if !group.is_finished() {
            println!("[{}]  ended with failures", group.log_name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stats_line_with_known_length() {
        let stats = ProgressStats {
            bytes_done: 1_048_576,
            total_bytes: Some(4 * 1_048_576),
            percent: 25,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(
            format_stats("x.iso", &stats),
            "x.iso   25%  1.0 / 4.0 MiB  1.00 MiB/s  ETA 3s"
        );
    }

    #[test]
    fn stats_line_with_unknown_length() {
        let stats = ProgressStats {
            bytes_done: 0,
            total_bytes: None,
            percent: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(
            format_stats("y", &stats),
            "y    0%  0.0 / ? MiB  0.00 MiB/s  ETA ?"
        );
    }
}
