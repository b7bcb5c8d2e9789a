//! Single-task downloads that bypass the registry and connection budget.
//! They still honour the global stop flag.

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::Scheduler;
use crate::error::DownloadError;
use crate::events::EventBundle;
use crate::task::Task;
use crate::transfer::{stopped_outcome, Attempt, BlockingWorker, Outcome};

impl Scheduler {
    /// Download `task` now, retrying recoverable failures after their
    /// backoff. Terminal failure is returned as the error.
    pub async fn download(
        &self,
        task: Arc<Task>,
        events: Option<EventBundle>,
    ) -> Result<Outcome, DownloadError> {
        if !task.try_admit() {
            return Err(DownloadError::validation(format!(
                "task {} is {}, not waiting",
                task.log_name(),
                task.status()
            )));
        }
        let events = events.map(Arc::new);
        loop {
            let executor = Arc::clone(self.executor());
            let (t, ev) = (Arc::clone(&task), events.clone());
            let joined = self
                .shared
                .runtime
                .spawn_blocking(move || {
                    let _worker = BlockingWorker::enter();
                    executor.execute(&t, ev.as_deref())
                })
                .await;
            let attempt = match joined {
                Ok(a) => a,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    return Err(DownloadError::validation(format!(
                        "download worker cancelled: {e}"
                    )))
                }
            };
            match attempt {
                Attempt::Done(outcome) => return Ok(outcome),
                Attempt::Failed(err) => return Err(err),
                Attempt::Retry(_, delay) => {
                    tokio::time::sleep(delay).await;
                    if !task.try_admit() {
                        return Ok(stopped_outcome(&task));
                    }
                }
            }
        }
    }

    /// Fire-and-forget [`Scheduler::download`]. Failures reach the caller
    /// only through `events` and the global listener.
    pub fn spawn_download(&self, task: Arc<Task>, events: Option<EventBundle>) -> JoinHandle<()> {
        let this = self.clone();
        self.shared.runtime.spawn(async move {
            let name = task.log_name();
            if let Err(err) = this.download(task, events).await {
                tracing::warn!(task = %name, error = %err, "direct download failed");
            }
        })
    }
}
