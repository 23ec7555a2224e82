//! File-store abstraction.
//!
//! All paths handed to a [`FileStore`] are relative to an app-private root, so
//! they stay valid when the root is relocated. Absolute paths are only produced
//! on demand for handing to the media engine.

mod local;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;

pub use local::LocalFileStore;

use crate::logging::RunLogger;

/// Errors from file-store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error in {operation} for '{path}': {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Path escapes the store root: {0}")]
    OutsideRoot(PathBuf),
}

impl StorageError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// One entry of a store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    /// Root-relative.
    pub path: PathBuf,
    pub is_dir: bool,
    pub modified: SystemTime,
}

impl StoreEntry {
    /// Time since the last modification; zero for timestamps in the future.
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.modified)
            .unwrap_or(Duration::ZERO)
    }
}

/// Storage backend for run artifacts.
pub trait FileStore: Send + Sync {
    /// Resolve a root-relative path to an absolute one.
    fn absolute_path(&self, relative: &Path) -> PathBuf;

    /// Create a directory (and parents). Succeeds if it already exists.
    fn make_directory(&self, relative: &Path) -> StorageResult<()>;

    /// Delete everything inside a directory, keeping the directory.
    fn clean_directory(&self, relative: &Path) -> StorageResult<()>;

    /// Remove an empty directory.
    fn remove_directory(&self, relative: &Path) -> StorageResult<()>;

    /// Write a file, returning its absolute path.
    fn write_file(&self, relative: &Path, contents: &[u8]) -> StorageResult<PathBuf>;

    fn read_binary_file(&self, relative: &Path) -> StorageResult<Vec<u8>>;

    fn delete_file(&self, relative: &Path) -> StorageResult<()>;

    fn exists(&self, relative: &Path) -> bool;

    /// Direct children of a directory, in no particular order.
    fn list_directory(&self, relative: &Path) -> StorageResult<Vec<StoreEntry>>;
}

/// Best-effort delete of `paths`. Missing files are skipped; failures are
/// logged and otherwise ignored.
pub fn discard(store: &dyn FileStore, logger: &RunLogger, paths: &[&Path]) {
    for path in paths {
        if !store.exists(path) {
            continue;
        }
        if let Err(e) = store.delete_file(path) {
            logger.warn(&format!("Could not delete {}: {}", path.display(), e));
            tracing::warn!("Could not delete {}: {}", path.display(), e);
        }
    }
}
