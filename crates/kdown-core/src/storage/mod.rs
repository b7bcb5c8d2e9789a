//! Destination directory checks and the per-task file layout.
//!
//! For a task named `<name>` in `<dir>`:
//! - `<dir>/<name>` is the final file, created only by the rename at the end.
//! - `<dir>/<name>.kd` is the staging file receiving body bytes at their offset.
//! - `<dir>/<name>.kd.cfg` is the sidecar holding the raw validator tag.

mod sidecar;
mod staging;

pub use sidecar::{read_sidecar, write_sidecar};
pub use staging::StagingFile;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub const STAGING_SUFFIX: &str = ".kd";
pub const SIDECAR_SUFFIX: &str = ".kd.cfg";

pub fn final_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

pub fn staging_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}{STAGING_SUFFIX}"))
}

pub fn sidecar_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}{SIDECAR_SUFFIX}"))
}

/// Create `dir` if needed and confirm it is a writable directory.
pub fn ensure_writable_dir(dir: &Path) -> Result<(), StorageError> {
    match fs::metadata(dir) {
        Ok(m) if !m.is_dir() => return Err(StorageError::NotADirectory(dir.to_path_buf())),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
            tracing::debug!(dir = %dir.display(), "created download directory");
        }
        Err(e) => return Err(StorageError::io(format!("stat {}", dir.display()), e)),
    }
    if !is_writable(dir) {
        return Err(StorageError::NotWritable(dir.to_path_buf()));
    }
    Ok(())
}

#[cfg(unix)]
fn is_writable(dir: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c) = CString::new(dir.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: `c` is a valid NUL-terminated path for the duration of the call.
    unsafe { libc::access(c.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(dir: &Path) -> bool {
    fs::metadata(dir)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

/// Bytes available to unprivileged users on the filesystem holding `dir`.
#[cfg(unix)]
pub fn free_space(dir: &Path) -> Result<u64, StorageError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c = CString::new(dir.as_os_str().as_bytes()).map_err(|e| {
        StorageError::io(
            format!("statvfs {}", dir.display()),
            io::Error::new(io::ErrorKind::InvalidInput, e),
        )
    })?;
    // SAFETY: statvfs only writes into `st`; `c` outlives the call.
    let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c.as_ptr(), &mut st) };
    if rc != 0 {
        return Err(StorageError::io(
            format!("statvfs {}", dir.display()),
            io::Error::last_os_error(),
        ));
    }
    Ok((st.f_bavail as u64).saturating_mul(st.f_frsize as u64))
}

#[cfg(not(unix))]
pub fn free_space(_dir: &Path) -> Result<u64, StorageError> {
    Ok(u64::MAX)
}

/// Fail unless `dir` has room for `required` more bytes. Zero free bytes
/// is reported separately since it usually means the query itself failed.
pub fn ensure_free_space(dir: &Path, required: u64) -> Result<(), StorageError> {
    let free = free_space(dir)?;
    if free == 0 {
        return Err(StorageError::FreeSpaceUnknown(dir.to_path_buf()));
    }
    if free < required {
        return Err(StorageError::Insufficient { free, required });
    }
    Ok(())
}

/// Remove the staging file and sidecar, ignoring ones that do not exist.
pub fn remove_staging(dir: &Path, name: &str) {
    for path in [staging_path(dir, name), sidecar_path(dir, name)] {
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "remove failed"),
        }
    }
}

/// Delete an existing final file (overwrite enabled).
pub fn remove_final(dir: &Path, name: &str) -> Result<(), StorageError> {
    let path = final_path(dir, name);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::io(format!("remove {}", path.display()), e)),
    }
}

/// Rename the staging file onto the final name and drop the sidecar.
pub fn finalize(dir: &Path, name: &str) -> Result<PathBuf, StorageError> {
    let from = staging_path(dir, name);
    let to = final_path(dir, name);
    fs::rename(&from, &to).map_err(|e| {
        StorageError::io(format!("rename {} to {}", from.display(), to.display()), e)
    })?;
    let sidecar = sidecar_path(dir, name);
    if let Err(e) = fs::remove_file(&sidecar) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %sidecar.display(), error = %e, "sidecar not removed");
        }
    }
    Ok(to)
}
