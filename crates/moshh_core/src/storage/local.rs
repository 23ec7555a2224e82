//! Local filesystem store rooted at a directory.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use super::{FileStore, StorageError, StorageResult, StoreEntry};

/// [`FileStore`] over the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Create a store rooted at `root`. The root is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve, rejecting `..` components that would leave the root.
    fn resolve(&self, relative: &Path) -> StorageResult<PathBuf> {
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            return Err(StorageError::OutsideRoot(relative.to_path_buf()));
        }
        Ok(self.root.join(relative))
    }
}

impl FileStore for LocalFileStore {
    fn absolute_path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    fn make_directory(&self, relative: &Path) -> StorageResult<()> {
        let path = self.resolve(relative)?;
        fs::create_dir_all(&path).map_err(|e| StorageError::io("make_directory", &path, e))
    }

    fn clean_directory(&self, relative: &Path) -> StorageResult<()> {
        let path = self.resolve(relative)?;
        let entries =
            fs::read_dir(&path).map_err(|e| StorageError::io("clean_directory", &path, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io("clean_directory", &path, e))?;
            let entry_path = entry.path();
            let result = if entry_path.is_dir() {
                fs::remove_dir_all(&entry_path)
            } else {
                fs::remove_file(&entry_path)
            };
            result.map_err(|e| StorageError::io("clean_directory", &entry_path, e))?;
        }
        Ok(())
    }

    fn remove_directory(&self, relative: &Path) -> StorageResult<()> {
        let path = self.resolve(relative)?;
        fs::remove_dir(&path).map_err(|e| StorageError::io("remove_directory", &path, e))
    }

    fn write_file(&self, relative: &Path, contents: &[u8]) -> StorageResult<PathBuf> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io("write_file", parent, e))?;
        }

        let mut file = fs::File::create(&path).map_err(|e| StorageError::io("write_file", &path, e))?;
        file.write_all(contents)
            .map_err(|e| StorageError::io("write_file", &path, e))?;
        Ok(path)
    }

    fn read_binary_file(&self, relative: &Path) -> StorageResult<Vec<u8>> {
        let path = self.resolve(relative)?;
        fs::read(&path).map_err(|e| StorageError::io("read_binary_file", &path, e))
    }

    fn delete_file(&self, relative: &Path) -> StorageResult<()> {
        let path = self.resolve(relative)?;
        fs::remove_file(&path).map_err(|e| StorageError::io("delete_file", &path, e))
    }

    fn exists(&self, relative: &Path) -> bool {
        self.resolve(relative).map(|p| p.exists()).unwrap_or(false)
    }

    fn list_directory(&self, relative: &Path) -> StorageResult<Vec<StoreEntry>> {
        let path = self.resolve(relative)?;
        let entries =
            fs::read_dir(&path).map_err(|e| StorageError::io("list_directory", &path, e))?;

        let mut listed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io("list_directory", &path, e))?;
            let metadata = entry
                .metadata()
                .map_err(|e| StorageError::io("list_directory", entry.path(), e))?;
            let modified = metadata
                .modified()
                .map_err(|e| StorageError::io("list_directory", entry.path(), e))?;
            listed.push(StoreEntry {
                path: relative.join(entry.file_name()),
                is_dir: metadata.is_dir(),
                modified,
            });
        }
        Ok(listed)
    }
}
