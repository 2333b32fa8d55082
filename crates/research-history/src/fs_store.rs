//! Filesystem persistence layer.
//!
//! Each key is one file under a root directory. Writes go through a temp
//! file and a rename, so a reader sees either the old or the new value.
//! A file that is not valid UTF-8 is reported as
//! [`StorageError::CorruptValue`].

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::storage_traits::{KeyValueStore, StorageResult};

/// Filesystem-backed key-value store, one file per key.
///
/// Layout: `<root>/<key>`. Keys are limited to ASCII alphanumerics plus
/// `.`, `_` and `-`, and may not start with `.` (temp files do).
///
/// With a capacity set, a write is rejected when the sum of key and value
/// lengths over every stored key would exceed it.
pub struct FsKeyValueStore {
    root: PathBuf,
    capacity: Option<usize>,
}

impl FsKeyValueStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            capacity: None,
        })
    }

    /// Enforce a byte quota on writes.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    /// Bytes used by every key except `skip`.
    fn usage_excluding(&self, skip: &str) -> StorageResult<usize> {
        let mut total = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name == skip || name.starts_with('.') || !entry.file_type()?.is_file() {
                continue;
            }
            total += name.len() + entry.metadata()?.len() as usize;
        }
        Ok(total)
    }
}

impl KeyValueStore for FsKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.key_path(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| StorageError::CorruptValue {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;

        if let Some(capacity) = self.capacity {
            let required = self.usage_excluding(key)? + key.len() + value.len();
            if required > capacity {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    required,
                    capacity,
                });
            }
        }

        // Atomic write: temp file in the same directory, then rename.
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
