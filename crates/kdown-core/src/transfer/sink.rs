//! Streams a data response into the staging file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{DownloadError, NetworkError};
use crate::events::{EventBundle, EventSink, ProgressGate};
use crate::storage::{write_sidecar, StagingFile};
use crate::task::{Status, Task};
use crate::transport::{BodySink, ResponseHead, SinkFlow};
use std::path::PathBuf;

pub(super) struct StagingSink<'a> {
    pub(super) task: &'a Arc<Task>,
    pub(super) staging: StagingFile,
    pub(super) sidecar: PathBuf,
    /// Next write offset in the staging file.
    pub(super) offset: u64,
    pub(super) probed_etag: Option<String>,
    pub(super) events: &'a EventSink,
    pub(super) bundle: Option<&'a EventBundle>,
    pub(super) queue_paused: &'a AtomicBool,
    /// Body bytes received by this request.
    pub(super) received: u64,
    pub(super) gate: ProgressGate,
    pub(super) group_gate: ProgressGate,
}

impl StagingSink<'_> {
    /// Cooperative stop: queue stopped, or the task left `Running`
    /// (suspend, cancel).
    fn should_stop(&self) -> bool {
        self.queue_paused.load(Ordering::Acquire) || self.task.status() != Status::Running
    }
}

impl BodySink for StagingSink<'_> {
    fn on_head(&mut self, head: &ResponseHead) -> Result<SinkFlow, DownloadError> {
        if !head.is_success() {
            return Err(NetworkError::Http(head.status).into());
        }
        if self.offset > 0 && head.status != 206 {
            tracing::info!(
                task = %self.task.log_name(),
                status = head.status,
                offset = self.offset,
                "range not honoured, restarting from 0"
            );
            self.staging.truncate(0)?;
            self.offset = 0;
            self.task.set_downloaded(0);
        }

        if let Some(tag) = head.etag.as_deref().or(self.probed_etag.as_deref()) {
            if let Err(e) = write_sidecar(&self.sidecar, tag) {
                tracing::warn!(task = %self.task.log_name(), error = %e, "sidecar not written");
            }
        }

        if !self.task.transition(Status::Connecting, Status::Running) {
            return Ok(SinkFlow::Stop);
        }
        tracing::debug!(task = %self.task.log_name(), status = head.status, offset = self.offset, "running");
        if self.should_stop() {
            return Ok(SinkFlow::Stop);
        }
        Ok(SinkFlow::Continue)
    }

    fn on_chunk(&mut self, chunk: &[u8]) -> Result<SinkFlow, DownloadError> {
        self.staging.write_at(self.offset, chunk)?;
        self.offset += chunk.len() as u64;
        self.received += chunk.len() as u64;
        let adv = self.task.advance(chunk.len() as u64);

        let now = Instant::now();
        if self.gate.admit(adv.percent_changed, now) {
            self.events.progress(self.task, self.task.percent(), self.bundle);
        }
        if let Some(group) = self.task.group() {
            if self.group_gate.admit(adv.group_changed, now) {
                self.events.group_progress(&group, group.percent(), self.bundle);
            }
        }

        if self.should_stop() {
            return Ok(SinkFlow::Stop);
        }
        Ok(SinkFlow::Continue)
    }
}
