//! Run-scoped temp artifact tracking and cleanup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::logging::RunLogger;
use crate::storage::FileStore;

/// Name → store-relative path of every temp file a run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempArtifacts {
    entries: BTreeMap<String, PathBuf>,
}

impl TempArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path. Re-registering a name replaces it.
    pub fn track(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(name.into(), path.into());
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }
}

/// What cleanup managed to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: Vec<PathBuf>,
    pub namespace_removed: bool,
}

/// Delete every tracked artifact, then the (now empty) namespace directory.
///
/// Failures are logged and collected, never returned as errors.
pub fn cleanup_run(
    store: &dyn FileStore,
    logger: &RunLogger,
    namespace: &Path,
    artifacts: &TempArtifacts,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    for (name, path) in artifacts.iter() {
        if !store.exists(path) {
            continue;
        }
        match store.delete_file(path) {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                logger.warn(&format!("Could not delete {} ({}): {}", name, path.display(), e));
                tracing::warn!("Could not delete {}: {}", path.display(), e);
                report.failed.push(path.to_path_buf());
            }
        }
    }

    if store.exists(namespace) {
        match store.remove_directory(namespace) {
            Ok(()) => report.namespace_removed = true,
            Err(e) => {
                logger.warn(&format!("Could not remove {}: {}", namespace.display(), e));
                tracing::warn!("Could not remove {}: {}", namespace.display(), e);
            }
        }
    }

    logger.debug(&format!("Cleanup deleted {} artifact(s)", report.deleted));
    report
}
