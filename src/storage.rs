//! Key-value storage backends.
//!
//! The store depends only on the [`StorageBackend`] capability. A durable
//! file-backed implementation is preferred when a probe succeeds; otherwise
//! an in-memory map stands in with identical behavior for the lifetime of
//! the process.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Key-value persistence capability.
pub trait StorageBackend {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`, if any.
    fn remove(&mut self, key: &str);
}

/// In-memory fallback backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }
}

/// Durable backend storing one file per key under a directory.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open a file-backed store, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir).map_err(|error| StorageError {
            message: format!("cannot create storage directory: {}", error),
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Probe whether the directory is actually writable.
    ///
    /// Returns `None` on any failure; probing never panics or propagates
    /// errors, so callers can silently select a fallback.
    pub fn probe(dir: &Path) -> Option<Self> {
        let mut storage = Self::open(dir).ok()?;
        let probe_key = "__bingo_state_probe__";
        storage.set(probe_key, "ok").ok()?;
        storage.remove(probe_key);
        Some(storage)
    }

    fn path_for_key(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.dir.join(sanitized)
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for_key(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::write(self.path_for_key(key), value).map_err(|error| StorageError {
            message: format!("cannot write {}: {}", key, error),
        })
    }

    fn remove(&mut self, key: &str) {
        let _ = std::fs::remove_file(self.path_for_key(key));
    }
}

/// Select the durable backend when usable, otherwise fall back to memory.
pub fn resolve_storage(dir: &Path) -> Box<dyn StorageBackend> {
    match FileStorage::probe(dir) {
        Some(storage) => Box::new(storage),
        None => {
            tracing::warn!(
                dir = %dir.display(),
                "durable storage unavailable, falling back to in-memory storage"
            );
            Box::new(MemoryStorage::new())
        }
    }
}

/// Storage write failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    pub message: String,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Storage failure: {}", self.message)
    }
}

impl std::error::Error for StorageError {}
