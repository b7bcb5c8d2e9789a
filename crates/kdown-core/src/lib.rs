//! kdown engine: a prioritised, resumable, concurrent download queue.
//!
//! Submit [`Task`]s (or a [`TaskGroup`]) to a [`Scheduler`]; it admits them
//! under a connection budget, runs each on a blocking worker through
//! [`TransferExecutor`], and reports through [`DownloadListener`] and
//! per-call [`EventBundle`]s.

pub mod config;
pub mod logging;

pub mod checksum;
pub mod error;
pub mod events;
pub mod fetch_head;
pub mod group;
pub mod history;
pub mod lifecycle;
pub mod retry;
pub mod safe_resume;
pub mod scheduler;
pub mod storage;
pub mod task;
pub mod transfer;
pub mod transport;
pub mod url_model;

pub use config::KdownConfig;
pub use error::{DownloadError, NetworkError, StorageError};
pub use events::{DownloadListener, EventBundle, GroupListener};
pub use group::{GroupOutcome, TaskGroup};
pub use history::{HistoryStore, MemoryHistoryStore};
pub use lifecycle::LifecycleHook;
pub use scheduler::{ProgressStats, Scheduler, SchedulerBuilder};
pub use task::{Status, Task, TaskBuilder};
pub use transfer::{Outcome, TransferExecutor};
pub use transport::{CurlTransport, HttpTransport};
