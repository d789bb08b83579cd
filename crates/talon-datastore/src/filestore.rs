//! File-backed ground truth
//!
//! Synchronous store of (path, bytes) under a root directory. Every
//! record is one file; directories mirror the path components. The
//! caches sit in front of this backend, so its contract is small:
//! create/replace, read (distinguishing "not found" from other I/O
//! failures), idempotent delete, and a stable-order child listing.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use talon_common::{Error, Result, StorePath};
use tracing::debug;

/// Local-filesystem record store
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The store's root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store path onto the filesystem
    fn file_path(&self, path: &StorePath) -> Result<PathBuf> {
        let mut location = self.root.clone();
        for component in path.components() {
            if component.is_empty()
                || component == "."
                || component == ".."
                || component.contains(['/', '\\'])
            {
                return Err(Error::Configuration(format!(
                    "unsafe path component: {component:?}"
                )));
            }
            location.push(component);
        }
        Ok(location)
    }

    /// Create or replace the record at `path`
    pub fn write_content(&self, path: &StorePath, data: &[u8]) -> Result<()> {
        let location = self.file_path(path)?;
        if let Some(parent) = location.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&location, data)?;
        Ok(())
    }

    /// Read the record at `path`. With `must_exist`, a missing record is
    /// `NotFound`; otherwise it reads as empty.
    pub fn read_content(&self, path: &StorePath, must_exist: bool) -> Result<Vec<u8>> {
        let location = self.file_path(path)?;
        match fs::read(&location) {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if must_exist {
                    Err(Error::NotFound)
                } else {
                    Ok(Vec::new())
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Delete the record at `path`. Deleting a missing record is a no-op.
    pub fn delete_subject(&self, path: &StorePath) -> Result<()> {
        let location = self.file_path(path)?;
        match fs::remove_file(&location) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path, "delete of missing record");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Direct children of `path`, sorted by name. A missing directory is
    /// `NotFound` so callers can distinguish it from an empty one.
    pub fn list_children(&self, path: &StorePath) -> Result<Vec<StorePath>> {
        let location = self.file_path(path)?;
        let entries = match fs::read_dir(&location) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(Error::NotFound),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!(?name, "skipping non-UTF-8 directory entry"),
            }
        }
        names.sort_unstable();

        Ok(names.into_iter().map(|name| path.child(name)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talon_common::PayloadKind;
    use tempfile::tempdir;

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let path = StorePath::json(["clients", "C.1", "ping.json.db"]);

        store.write_content(&path, b"{\"seen\":1}").unwrap();
        let data = store.read_content(&path, true).unwrap();
        assert_eq!(data, b"{\"seen\":1}");
    }

    #[test]
    fn test_read_missing() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let path = StorePath::json(["missing.json.db"]);

        let err = store.read_content(&path, true).unwrap_err();
        assert!(err.is_not_found());

        // Without must_exist a missing record reads as empty.
        let data = store.read_content(&path, false).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let path = StorePath::json(["a", "b.json.db"]);

        store.write_content(&path, b"x").unwrap();
        store.delete_subject(&path).unwrap();
        store.delete_subject(&path).unwrap();
        assert!(store.read_content(&path, true).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_children_sorted_with_tags() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let parent = StorePath::json(["clients", "C.1"]);

        store
            .write_content(&parent.child("zz.json.db"), b"{}")
            .unwrap();
        store.write_content(&parent.child("ping.db"), b"\x01").unwrap();
        store
            .write_content(&parent.child("collections").child("F.1.json.db"), b"{}")
            .unwrap();

        let children = store.list_children(&parent).unwrap();
        let names: Vec<_> = children
            .iter()
            .map(|child| child.file_name().unwrap().to_string())
            .collect();
        assert_eq!(names, ["collections", "ping.db", "zz.json.db"]);

        assert_eq!(children[1].kind(), PayloadKind::Binary);
        assert_eq!(children[2].kind(), PayloadKind::Json);
    }

    #[test]
    fn test_list_missing_directory() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let err = store
            .list_children(&StorePath::json(["nothing", "here"]))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unsafe_components_rejected() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let path = StorePath::json(["..", "escape.json.db"]);
        assert!(store.write_content(&path, b"x").is_err());
    }
}
