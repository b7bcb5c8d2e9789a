//! Positional writer for the `.kd` staging file.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Open staging file. Bytes land at explicit offsets, so the file content
/// always mirrors the contiguous prefix received so far.
#[derive(Debug)]
pub struct StagingFile {
    file: File,
    path: PathBuf,
}

impl StagingFile {
    /// Open (creating if missing) without truncating existing bytes.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| StorageError::io(format!("open staging file {}", path.display()), e))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> Result<u64, StorageError> {
        self.file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| StorageError::io(format!("stat {}", self.path.display()), e))
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Cut the file to `len` bytes.
    pub fn truncate(&self, len: u64) -> Result<(), StorageError> {
        self.file
            .set_len(len)
            .map_err(|e| StorageError::io(format!("truncate {}", self.path.display()), e))
    }

    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), StorageError> {
        use std::os::unix::fs::FileExt;
        self.file
            .write_all_at(data, offset)
            .map_err(|e| StorageError::io(format!("write {}", self.path.display()), e))
    }

    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<(), StorageError> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = &self.file;
        f.seek(SeekFrom::Start(offset))
            .and_then(|_| f.write_all(data))
            .map_err(|e| StorageError::io(format!("write {}", self.path.display()), e))
    }
}
