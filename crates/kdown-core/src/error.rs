//! Error taxonomy for a single transfer attempt.
//!
//! Every protocol step returns `DownloadError`; the executor catches it once at
//! the attempt boundary and routes it through `Task::failed`, which decides
//! between a retry and a terminal failure.

use std::io;
use std::path::PathBuf;

/// Failure of one transfer attempt.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Bad URL, destination occupied without overwrite, or misuse of the API.
    #[error("invalid download request: {0}")]
    Validation(String),
    /// Probe or data request failed, non-2xx status, or the body ended early.
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Directory, permission, or free-space problem.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A blocking transfer was started on an async executor thread.
    #[error("blocking transfer started on an async runtime thread; use Scheduler::download or spawn_blocking")]
    WrongExecutionContext,
}

impl DownloadError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        DownloadError::Validation(msg.into())
    }
}

/// Network-level failure of a probe or data request.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// libcurl reported an error (timeout, connection, DNS, ...).
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    /// Response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// The body ended before `expected` bytes were received.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Data request succeeded but carried no body.
    #[error("response carried no body")]
    MissingBody,
    /// The transfer ended without a complete response head.
    #[error("no response head received")]
    NoResponse,
}

/// Filesystem failure around the destination directory and staging files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot create download directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} exists and is not a directory")]
    NotADirectory(PathBuf),
    #[error("download directory {0} is not writable")]
    NotWritable(PathBuf),
    #[error("insufficient free space: {free} bytes available, {required} required")]
    Insufficient { free: u64, required: u64 },
    /// statvfs reported zero free bytes, which usually means the volume could not be read.
    #[error("free space at {0} reads as zero; cannot determine capacity")]
    FreeSpaceUnknown(PathBuf),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_cause() {
        let e = DownloadError::from(NetworkError::Http(404));
        assert_eq!(e.to_string(), "HTTP 404");

        let e = DownloadError::from(StorageError::Insufficient {
            free: 10,
            required: 20,
        });
        assert!(e.to_string().contains("10 bytes available"));

        let e = DownloadError::validation("destination occupied: /tmp/a.bin");
        assert!(e.to_string().contains("destination occupied"));
    }
}
