//! Resumable single-stream transfer of one task.
//!
//! One call to [`TransferExecutor::execute`] is one attempt:
//!
//! 1. destination directory exists (or is created) and is writable
//! 2. URL scheme is http or https
//! 3. filename resolved; an existing final file without overwrite fails
//!    here, before any request
//! 4. metadata probe (length, range support, ETag)
//! 5. free space covers the length
//! 6. overwrite deletes the old final file
//! 7. staging file kept or discarded by comparing sidecar and probed tags
//! 8. GET, with `Range` when resuming, streamed into the staging file
//! 9. rename to the final name, or stay paused with the staged bytes
//!
//! Every error is caught once at the attempt boundary and routed through
//! [`Task::failed`], which decides between retry and terminal failure.

mod context;
mod sink;

pub use context::{ensure_blocking_allowed, BlockingWorker};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{KdownConfig, ProgressMode};
use crate::error::{DownloadError, NetworkError};
use crate::events::{EventBundle, EventSink, ProgressGate};
use crate::fetch_head::{self, identity_encoding, ProbeResult};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::safe_resume::{self, Probed};
use crate::storage::{self, StagingFile};
use crate::task::{effective_connections, Status, Task};
use crate::transport::{CurlTransport, Header, HttpTransport, TransferEnd};
use crate::url_model;
use sink::StagingSink;

/// How an attempt ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Renamed to this final path.
    Finished(PathBuf),
    /// Stopped cooperatively; staged bytes kept for the next attempt.
    Paused,
    /// Cancelled; staging files removed.
    Cancelled,
}

/// Full result of one attempt, after `Task::failed` has run.
#[derive(Debug)]
pub(crate) enum Attempt {
    Done(Outcome),
    /// Recoverable failure; the task is `Paused` until the delay passes.
    Retry(DownloadError, Duration),
    /// Terminal failure; the task is `Failed`.
    Failed(DownloadError),
}

/// Runs the transfer protocol for admitted tasks.
pub struct TransferExecutor {
    transport: Arc<dyn HttpTransport>,
    events: Arc<EventSink>,
    policy: RetryPolicy,
    progress_mode: ProgressMode,
    progress_interval: Duration,
    queue_paused: AtomicBool,
}

impl TransferExecutor {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        events: Arc<EventSink>,
        cfg: &KdownConfig,
    ) -> Self {
        Self {
            transport,
            events,
            policy: cfg.retry.as_ref().map(RetryPolicy::from).unwrap_or_default(),
            progress_mode: cfg.progress_mode,
            progress_interval: cfg.min_progress_interval(),
            queue_paused: AtomicBool::new(false),
        }
    }

    /// Executor over libcurl with a fresh event sink.
    pub fn from_config(cfg: &KdownConfig) -> Self {
        let transport = Arc::new(CurlTransport::new(cfg.http_or_default()));
        Self::new(transport, Arc::new(EventSink::new()), cfg)
    }

    pub fn events(&self) -> &Arc<EventSink> {
        &self.events
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Global stop flag, checked before each chunk is accepted.
    pub fn set_queue_paused(&self, paused: bool) {
        self.queue_paused.store(paused, Ordering::Release);
    }

    pub fn is_queue_paused(&self) -> bool {
        self.queue_paused.load(Ordering::Acquire)
    }

    /// Metadata probe only (blocking).
    pub fn probe(&self, url: &str) -> Result<ProbeResult, DownloadError> {
        ensure_blocking_allowed()?;
        url_model::check_scheme(url)?;
        fetch_head::probe(self.transport.as_ref(), url)
    }

    /// Download `task` on the current thread, retrying recoverable failures
    /// after their backoff. Terminal failure is returned as the error.
    ///
    /// Fails with [`DownloadError::WrongExecutionContext`] on a tokio
    /// runtime thread not marked with [`BlockingWorker`].
    pub fn download_blocking(
        &self,
        task: &Arc<Task>,
        bundle: Option<&EventBundle>,
    ) -> Result<Outcome, DownloadError> {
        ensure_blocking_allowed()?;
        if !task.try_admit() {
            return Err(DownloadError::validation(format!(
                "task {} is {}, not waiting",
                task.log_name(),
                task.status()
            )));
        }
        loop {
            match self.execute(task, bundle) {
                Attempt::Done(outcome) => return Ok(outcome),
                Attempt::Failed(err) => return Err(err),
                Attempt::Retry(_, delay) => {
                    std::thread::sleep(delay);
                    if !task.try_admit() {
                        return Ok(stopped_outcome(task));
                    }
                }
            }
        }
    }

    /// One attempt for a task already moved to `Connecting`, with events.
    pub(crate) fn execute(&self, task: &Arc<Task>, bundle: Option<&EventBundle>) -> Attempt {
        self.events.start(task, bundle);
        let attempt = match self.attempt(task, bundle) {
            Ok(Outcome::Finished(path)) => {
                tracing::info!(task = %task.log_name(), path = %path.display(), "finished");
                self.events.finish(task, &path, bundle);
                Attempt::Done(Outcome::Finished(path))
            }
            Ok(Outcome::Paused) => {
                tracing::info!(task = %task.log_name(), offset = task.downloaded(), status = %task.status(), "paused");
                self.events.pause(task, bundle);
                Attempt::Done(Outcome::Paused)
            }
            Ok(Outcome::Cancelled) => {
                tracing::info!(task = %task.log_name(), "cancelled");
                Attempt::Done(Outcome::Cancelled)
            }
            Err(err) => {
                let decision = task.failed(&err, &self.policy);
                // A cancel or suspend may land while the failure is recorded.
                match (task.status(), decision) {
                    (Status::Cancel, _) => {
                        task.delete_staging();
                        tracing::info!(task = %task.log_name(), error = %err, "cancelled");
                        Attempt::Done(Outcome::Cancelled)
                    }
                    (Status::Suspend, _) => {
                        tracing::info!(task = %task.log_name(), error = %err, "suspended");
                        self.events.pause(task, bundle);
                        Attempt::Done(Outcome::Paused)
                    }
                    (_, RetryDecision::RetryAfter(delay)) => {
                        self.events.fail(task, &err, true, bundle);
                        Attempt::Retry(err, delay)
                    }
                    (_, RetryDecision::NoRetry) => {
                        self.events.fail(task, &err, false, bundle);
                        Attempt::Failed(err)
                    }
                }
            }
        };
        self.events.terminate(task, bundle);
        attempt
    }

    fn stop_requested(&self, task: &Task) -> Option<Outcome> {
        match task.status() {
            Status::Cancel => Some(Outcome::Cancelled),
            Status::Suspend => Some(Outcome::Paused),
            _ if self.is_queue_paused() => Some(Outcome::Paused),
            _ => None,
        }
    }

    fn attempt(
        &self,
        task: &Arc<Task>,
        bundle: Option<&EventBundle>,
    ) -> Result<Outcome, DownloadError> {
        if let Some(stopped) = self.stop_requested(task) {
            return self.conclude_stopped(task, stopped);
        }

        let dir = task.dest_dir().to_path_buf();
        storage::ensure_writable_dir(&dir)?;
        let url = url_model::check_scheme(task.url())?;
        let name = url_model::resolve_name(&url, task.name().as_deref());
        task.set_name(name.clone());

        let final_path = storage::final_path(&dir, &name);
        let occupied = final_path.exists();
        if occupied && !task.overwrite() {
            return Err(DownloadError::validation(format!(
                "destination occupied: {}",
                final_path.display()
            )));
        }

        let probe = fetch_head::probe(self.transport.as_ref(), url.as_str())?;
        task.set_probe(probe.content_length, probe.resumable, probe.etag.clone());
        if let Some(len) = probe.content_length {
            storage::ensure_free_space(&dir, len)?;
        }
        if occupied {
            storage::remove_final(&dir, &name)?;
            tracing::debug!(task = %task.log_name(), "removed existing file");
        }

        let point = safe_resume::reconcile(
            &dir,
            &name,
            Probed {
                etag: probe.etag.as_deref(),
                resumable: probe.resumable,
                length: probe.content_length,
            },
        )?;
        let offset = point.offset();
        task.set_downloaded(offset);

        let staging = StagingFile::open(&storage::staging_path(&dir, &name))?;
        if let Some(len) = probe.content_length {
            if offset >= len {
                drop(staging);
                return self.complete(task, &dir, &name);
            }
        }

        let mut headers: Vec<Header> = vec![identity_encoding()];
        if let Some(len) = probe.content_length {
            if offset > 0 {
                headers.push(("Range", format!("bytes={}-{}", offset, len - 1)));
            }
        }
        // One stream per task; the accounting value is logged only.
        let connections = effective_connections(task.max_connections(), probe.content_length);
        tracing::debug!(
            task = %task.log_name(),
            offset,
            length = ?probe.content_length,
            connections,
            "requesting data"
        );

        let mut sink = StagingSink {
            task,
            staging,
            sidecar: storage::sidecar_path(&dir, &name),
            offset,
            probed_etag: probe.etag.clone(),
            events: &self.events,
            bundle,
            queue_paused: &self.queue_paused,
            received: 0,
            gate: ProgressGate::new(self.progress_mode, self.progress_interval),
            group_gate: ProgressGate::new(self.progress_mode, self.progress_interval),
        };
        let end = self.transport.get(url.as_str(), &headers, &mut sink);
        let received = sink.received;
        // Close the staging handle on every path before touching the file.
        drop(sink);
        let end = end?;

        if let Some(stopped) = self.stop_requested(task) {
            if stopped == Outcome::Cancelled || end == TransferEnd::Stopped {
                return self.conclude_stopped(task, stopped);
            }
        }

        let done = task.downloaded();
        match (task.content_length(), end) {
            (Some(len), _) if done >= len => self.complete(task, &dir, &name),
            (Some(_), TransferEnd::Complete) if received == 0 => {
                Err(NetworkError::MissingBody.into())
            }
            (Some(len), TransferEnd::Complete) => Err(NetworkError::PartialTransfer {
                expected: len,
                received: done,
            }
            .into()),
            (None, TransferEnd::Complete) => self.complete(task, &dir, &name),
            (_, TransferEnd::Stopped) => {
                let stopped = self.stop_requested(task).unwrap_or(Outcome::Paused);
                self.conclude_stopped(task, stopped)
            }
        }
    }

    fn complete(&self, task: &Arc<Task>, dir: &std::path::Path, name: &str) -> Result<Outcome, DownloadError> {
        let claimed = task.transition(Status::Running, Status::Finished)
            || task.transition(Status::Connecting, Status::Finished);
        if !claimed {
            let stopped = self.stop_requested(task).unwrap_or(Outcome::Paused);
            return self.conclude_stopped(task, stopped);
        }
        let path = storage::finalize(dir, name)?;
        Ok(Outcome::Finished(path))
    }

    fn conclude_stopped(&self, task: &Arc<Task>, stopped: Outcome) -> Result<Outcome, DownloadError> {
        match stopped {
            Outcome::Cancelled => {
                task.delete_staging();
                Ok(Outcome::Cancelled)
            }
            _ => {
                // Suspend stays Suspend; anything still live goes back to Paused.
                let _ = task.transition(Status::Running, Status::Paused)
                    || task.transition(Status::Connecting, Status::Paused);
                Ok(Outcome::Paused)
            }
        }
    }
}

impl std::fmt::Debug for TransferExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferExecutor")
            .field("policy", &self.policy)
            .field("progress_mode", &self.progress_mode)
            .field("queue_paused", &self.is_queue_paused())
            .finish_non_exhaustive()
    }
}

/// What a task that could not be re-admitted after a backoff turned into.
pub(crate) fn stopped_outcome(task: &Task) -> Outcome {
    match task.status() {
        Status::Cancel => Outcome::Cancelled,
        _ => Outcome::Paused,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{BodySink, ResponseHead};
    use std::sync::Mutex;

    /// In-memory server: fixed body, optional ETag, optional early cut.
    struct Fake {
        body: Vec<u8>,
        etag: Option<String>,
        ranges: bool,
        cut_after: Mutex<Option<usize>>,
        requests: Mutex<Vec<Vec<Header>>>,
    }

    impl Fake {
        fn new(body: Vec<u8>) -> Self {
            Self {
                body,
                etag: Some("v1".into()),
                ranges: true,
                cut_after: Mutex::new(None),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn head_for(&self, status: u32, len: usize) -> ResponseHead {
            ResponseHead {
                status,
                content_length: Some(len as u64),
                accept_ranges: self.ranges,
                etag: self.etag.clone(),
            }
        }

        fn range_of(headers: &[Header]) -> Option<u64> {
            headers
                .iter()
                .find(|(k, _)| *k == "Range")
                .and_then(|(_, v)| v.strip_prefix("bytes="))
                .and_then(|v| v.split('-').next())
                .and_then(|v| v.parse().ok())
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl HttpTransport for Fake {
        fn head(&self, _url: &str, headers: &[Header]) -> Result<ResponseHead, NetworkError> {
            self.requests.lock().unwrap().push(headers.to_vec());
            Ok(self.head_for(200, self.body.len()))
        }

        fn get(
            &self,
            _url: &str,
            headers: &[Header],
            sink: &mut dyn BodySink,
        ) -> Result<TransferEnd, DownloadError> {
            self.requests.lock().unwrap().push(headers.to_vec());
            let start = match Self::range_of(headers) {
                Some(s) if self.ranges => s as usize,
                _ => 0,
            };
            let status = if start > 0 { 206 } else { 200 };
            let rest = &self.body[start..];
            if sink.on_head(&self.head_for(status, rest.len()))? == crate::transport::SinkFlow::Stop {
                return Ok(TransferEnd::Stopped);
            }
            let limit = self.cut_after.lock().unwrap().take().unwrap_or(rest.len());
            for chunk in rest[..limit.min(rest.len())].chunks(1000) {
                if sink.on_chunk(chunk)? == crate::transport::SinkFlow::Stop {
                    return Ok(TransferEnd::Stopped);
                }
            }
            Ok(TransferEnd::Complete)
        }
    }

    fn executor(fake: Arc<Fake>) -> TransferExecutor {
        let cfg = KdownConfig {
            retry: Some(crate::config::RetryConfig {
                base_delay_secs: 0.01,
                max_delay_secs: 1,
            }),
            ..KdownConfig::default()
        };
        TransferExecutor::new(fake, Arc::new(EventSink::new()), &cfg)
    }

    fn body(n: usize) -> Vec<u8> {
        (0..n).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn fresh_download_writes_body_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(Fake::new(body(10_000)));
        let exec = executor(fake.clone());
        let task = Task::builder("http://h/data.bin").dest_dir(dir.path()).build();

        let out = exec.download_blocking(&task, None).unwrap();
        let path = dir.path().join("data.bin");
        assert_eq!(out, Outcome::Finished(path.clone()));
        assert_eq!(std::fs::read(&path).unwrap(), fake.body);
        assert_eq!(task.status(), Status::Finished);
        assert_eq!(task.percent(), 100);
        assert!(!storage::staging_path(dir.path(), "data.bin").exists());
        assert!(!storage::sidecar_path(dir.path(), "data.bin").exists());
    }

    #[test]
    fn occupied_destination_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.bin"), b"old").unwrap();
        let fake = Arc::new(Fake::new(body(100)));
        let exec = executor(fake.clone());
        let task = Task::builder("http://h/data.bin").dest_dir(dir.path()).build();

        let err = exec.download_blocking(&task, None).unwrap_err();
        assert!(matches!(err, DownloadError::Validation(_)));
        assert_eq!(fake.request_count(), 0);
        assert_eq!(task.status(), Status::Failed);
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), b"old");
    }

    #[test]
    fn overwrite_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.bin"), b"old").unwrap();
        let fake = Arc::new(Fake::new(body(300)));
        let exec = executor(fake.clone());
        let task = Task::builder("http://h/data.bin")
            .dest_dir(dir.path())
            .overwrite(true)
            .build();
        exec.download_blocking(&task, None).unwrap();
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), fake.body);
    }

    #[test]
    fn unsupported_scheme_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(Arc::new(Fake::new(body(1))));
        let task = Task::builder("ftp://h/x").dest_dir(dir.path()).build();
        let err = exec.download_blocking(&task, None).unwrap_err();
        assert!(matches!(err, DownloadError::Validation(_)));
    }

    #[test]
    fn early_close_is_retried_and_resumes_with_range() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(Fake::new(body(5_000)));
        *fake.cut_after.lock().unwrap() = Some(2_000);
        let exec = executor(fake.clone());
        let task = Task::builder("http://h/data.bin").dest_dir(dir.path()).build();

        exec.download_blocking(&task, None).unwrap();
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), fake.body);
        assert_eq!(task.retries_left(), 2);

        let reqs = fake.requests.lock().unwrap();
        // HEAD, GET (cut), HEAD, GET with Range.
        assert_eq!(reqs.len(), 4);
        assert_eq!(Fake::range_of(&reqs[3]), Some(2_000));
        assert!(reqs[3].iter().any(|(k, v)| *k == "Range" && v == "bytes=2000-4999"));
    }

    #[test]
    fn empty_body_is_retried_as_missing_body() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(Fake::new(body(3_000)));
        *fake.cut_after.lock().unwrap() = Some(0);
        let exec = executor(fake.clone());
        let fails = Arc::new(Mutex::new(Vec::new()));
        let f2 = fails.clone();
        let bundle = EventBundle::new().on_fail(move |_, err, will_retry| {
            let missing = matches!(err, DownloadError::Network(NetworkError::MissingBody));
            f2.lock().unwrap().push((missing, will_retry));
        });
        let task = Task::builder("http://h/data.bin").dest_dir(dir.path()).build();

        exec.download_blocking(&task, Some(&bundle)).unwrap();
        assert_eq!(*fails.lock().unwrap(), vec![(true, true)]);
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), fake.body);
    }

    #[test]
    fn reset_after_failure_downloads_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(Fake::new(body(5_000)));
        *fake.cut_after.lock().unwrap() = Some(2_000);
        let exec = executor(fake.clone());
        let task = Task::builder("http://h/data.bin")
            .dest_dir(dir.path())
            .retry_times(0)
            .build();

        assert!(exec.download_blocking(&task, None).is_err());
        assert_eq!(task.status(), Status::Failed);
        let staging = storage::staging_path(dir.path(), "data.bin");
        assert_eq!(std::fs::metadata(&staging).unwrap().len(), 2_000);

        assert!(task.reset());
        assert!(!staging.exists());
        exec.download_blocking(&task, None).unwrap();
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), fake.body);

        let reqs = fake.requests.lock().unwrap();
        // HEAD, GET (cut), HEAD, GET from byte 0.
        assert_eq!(reqs.len(), 4);
        assert_eq!(Fake::range_of(&reqs[3]), None);
    }

    #[test]
    fn stale_staging_is_discarded_on_tag_change() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(storage::staging_path(dir.path(), "data.bin"), vec![0xFFu8; 700]).unwrap();
        std::fs::write(storage::sidecar_path(dir.path(), "data.bin"), "old-tag").unwrap();
        let fake = Arc::new(Fake::new(body(1_500)));
        let exec = executor(fake.clone());
        let task = Task::builder("http://h/data.bin").dest_dir(dir.path()).build();

        exec.download_blocking(&task, None).unwrap();
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), fake.body);
        let reqs = fake.requests.lock().unwrap();
        assert_eq!(Fake::range_of(&reqs[1]), None);
    }

    #[test]
    fn complete_staging_skips_data_request() {
        let dir = tempfile::tempdir().unwrap();
        let data = body(800);
        std::fs::write(storage::staging_path(dir.path(), "data.bin"), &data).unwrap();
        std::fs::write(storage::sidecar_path(dir.path(), "data.bin"), "v1").unwrap();
        let fake = Arc::new(Fake::new(data.clone()));
        let exec = executor(fake.clone());
        let task = Task::builder("http://h/data.bin").dest_dir(dir.path()).build();

        exec.download_blocking(&task, None).unwrap();
        assert_eq!(fake.request_count(), 1);
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), data);
    }

    #[test]
    fn queue_pause_keeps_staged_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(Fake::new(body(4_000)));
        let exec = executor(fake.clone());
        exec.set_queue_paused(true);
        let task = Task::builder("http://h/data.bin").dest_dir(dir.path()).build();

        let out = exec.download_blocking(&task, None).unwrap();
        assert_eq!(out, Outcome::Paused);
        assert_eq!(task.status(), Status::Paused);
        assert_eq!(fake.request_count(), 0);
    }

    #[test]
    fn cancel_during_transfer_removes_staging() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(Fake::new(body(50_000)));
        let exec = executor(fake.clone());
        let task = Task::builder("http://h/data.bin").dest_dir(dir.path()).build();
        let t2 = task.clone();
        let bundle = EventBundle::new().on_progress(move |_, pct| {
            if pct >= 10 {
                t2.cancel();
            }
        });

        let out = exec.download_blocking(&task, Some(&bundle)).unwrap();
        assert_eq!(out, Outcome::Cancelled);
        assert_eq!(task.status(), Status::Cancel);
        assert!(!dir.path().join("data.bin").exists());
        assert!(!storage::staging_path(dir.path(), "data.bin").exists());
        assert!(!storage::sidecar_path(dir.path(), "data.bin").exists());
    }

    #[test]
    fn progress_is_monotonic_and_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(Fake::new(body(20_000)));
        let exec = executor(fake);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s2 = seen.clone();
        let bundle = EventBundle::new().on_progress(move |_, p| s2.lock().unwrap().push(p));
        let task = Task::builder("http://h/data.bin").dest_dir(dir.path()).build();
        exec.download_blocking(&task, Some(&bundle)).unwrap();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[test]
    fn not_waiting_task_rejected() {
        let exec = executor(Arc::new(Fake::new(body(1))));
        let task = Task::builder("http://h/x").build();
        task.set_status(Status::Finished);
        assert!(matches!(
            exec.download_blocking(&task, None),
            Err(DownloadError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn blocking_download_on_runtime_thread_fails_fast() {
        let exec = executor(Arc::new(Fake::new(body(1))));
        let task = Task::builder("http://h/x").build();
        assert!(matches!(
            exec.download_blocking(&task, None),
            Err(DownloadError::WrongExecutionContext)
        ));
        assert_eq!(task.status(), Status::Created);
    }
}
