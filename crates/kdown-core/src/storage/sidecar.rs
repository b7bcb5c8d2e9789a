//! The `.kd.cfg` sidecar: raw validator tag text, nothing else.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::StorageError;

/// Stored tag, or `None` if the sidecar is missing or empty.
pub fn read_sidecar(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(s) => {
            let tag = s.trim();
            Ok((!tag.is_empty()).then(|| tag.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(format!("read {}", path.display()), e)),
    }
}

pub fn write_sidecar(path: &Path, tag: &str) -> Result<(), StorageError> {
    fs::write(path, tag).map_err(|e| StorageError::io(format!("write {}", path.display()), e))
}
