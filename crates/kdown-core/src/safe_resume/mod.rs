//! Decide whether staged bytes from an earlier attempt can be kept.
//!
//! A staging file is trusted only when its sidecar tag equals the tag just
//! probed and the server will honour a range request for a known length.
//! Anything else discards both files and restarts at byte 0.

use std::path::Path;

use crate::error::StorageError;
use crate::storage::{self, read_sidecar};

/// Outcome of reconciling the staging file with fresh probe metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// Nothing usable on disk; start from 0.
    Fresh,
    /// Continue after this many staged bytes.
    Resume(u64),
}

impl ResumePoint {
    pub fn offset(self) -> u64 {
        match self {
            ResumePoint::Fresh => 0,
            ResumePoint::Resume(n) => n,
        }
    }
}

/// Metadata from the probe that resume depends on.
#[derive(Debug, Clone, Copy)]
pub struct Probed<'a> {
    pub etag: Option<&'a str>,
    pub resumable: bool,
    pub length: Option<u64>,
}

/// Keep or discard `<name>.kd` / `<name>.kd.cfg` in `dir`.
pub fn reconcile(dir: &Path, name: &str, probed: Probed<'_>) -> Result<ResumePoint, StorageError> {
    let staging = storage::staging_path(dir, name);
    let staged = match std::fs::metadata(&staging) {
        Ok(m) => Some(m.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(StorageError::io(format!("stat {}", staging.display()), e)),
    };

    if let Some(staged) = staged {
        let stored = read_sidecar(&storage::sidecar_path(dir, name))?;
        let tags_match = matches!((stored.as_deref(), probed.etag), (Some(a), Some(b)) if a == b);
        let fits = probed.length.is_some_and(|len| staged <= len);
        if tags_match && probed.resumable && fits {
            tracing::debug!(file = name, offset = staged, "resuming staged bytes");
            return Ok(ResumePoint::Resume(staged));
        }
        tracing::debug!(
            file = name,
            staged,
            tags_match,
            resumable = probed.resumable,
            "discarding staged bytes"
        );
    }
    storage::remove_staging(dir, name);
    Ok(ResumePoint::Fresh)
}
