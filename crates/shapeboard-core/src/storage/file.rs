//! Reading and writing scene documents on disk.

use super::{StorageError, StorageResult};
use std::fs;
use std::path::Path;

/// Read a whole document file as text.
pub(crate) fn read_document(path: &Path) -> StorageResult<String> {
    if !path.exists() {
        return Err(StorageError::NotFound(path.display().to_string()));
    }
    fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))
}

/// Write a document, creating missing parent directories.
pub(crate) fn write_document(path: &Path, text: &str) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::Io(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }
    }
    fs::write(path, text)
        .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
}
