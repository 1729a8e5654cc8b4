//! Local storage adapter
//!
//! Translates slash-rooted logical paths into operations against the
//! node's private storage root. Knows nothing about the network or the log.

pub mod tree;

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::oplog::{Command, Operation};

pub use tree::{render_tree, TreeEntry};

/// Executes operations against a directory tree on local disk
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::storage(&root, e))?;
        Ok(Self { root })
    }

    /// Storage root on local disk
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a logical path onto the local root.
    ///
    /// Leading separators are stripped before joining, so `/a/b` and `a/b`
    /// resolve to the same file. Parent-directory segments are rejected.
    pub fn resolve(&self, logical: &str) -> Result<PathBuf> {
        let relative = Path::new(logical.trim_start_matches('/'));

        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(Error::InvalidPath(logical.to_string())),
            }
        }

        Ok(self.root.join(relative))
    }

    /// Like `resolve`, but refuses paths that name the root itself
    fn resolve_entry(&self, logical: &str) -> Result<PathBuf> {
        let path = self.resolve(logical)?;
        let names_entry = path
            .strip_prefix(&self.root)
            .map(|rel| rel.components().any(|c| matches!(c, Component::Normal(_))))
            .unwrap_or(false);
        if !names_entry {
            return Err(Error::InvalidPath(logical.to_string()));
        }
        Ok(path)
    }

    /// Create a directory and any missing ancestors
    pub fn create_dir(&self, logical: &str) -> Result<()> {
        let path = self.resolve(logical)?;
        fs::create_dir_all(&path).map_err(|e| Error::storage(&path, e))
    }

    /// Create or overwrite a file with raw bytes
    pub fn write_bytes(&self, logical: &str, content: &[u8]) -> Result<()> {
        let path = self.resolve_entry(logical)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::storage(parent, e))?;
        }
        fs::write(&path, content).map_err(|e| Error::storage(&path, e))
    }

    /// Create or overwrite a file with UTF-8 text
    pub fn write_text(&self, logical: &str, content: &str) -> Result<()> {
        self.write_bytes(logical, content.as_bytes())
    }

    /// Remove a file, or a directory with all of its contents.
    ///
    /// Deleting a path that does not exist is a no-op.
    pub fn delete(&self, logical: &str) -> Result<()> {
        let path = self.resolve_entry(logical)?;

        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Nothing to delete at {:?}", path);
                return Ok(());
            }
            Err(e) => return Err(Error::storage(&path, e)),
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(&path, e)),
        }
    }

    /// Execute a replicated operation
    pub fn execute(&self, op: &Operation) -> Result<()> {
        match op.cmd {
            Command::Mkdir => self.create_dir(&op.path),
            Command::Delete => self.delete(&op.path),
            Command::Transfer => self.write_bytes(&op.path, op.content()),
            Command::Write => {
                let text = std::str::from_utf8(op.content()).map_err(|e| {
                    Error::storage(
                        self.root.join(op.path.trim_start_matches('/')),
                        io::Error::new(io::ErrorKind::InvalidData, e),
                    )
                })?;
                self.write_text(&op.path, text)
            }
        }
    }

    /// Snapshot of the local tree for display
    pub fn list_tree(&self) -> Result<Vec<TreeEntry>> {
        tree::walk(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_strips_leading_separator() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        let a = store.resolve("/a/b/c.txt").unwrap();
        let b = store.resolve("a/b/c.txt").unwrap();
        let c = store.resolve("//a/b/c.txt").unwrap();
        assert_eq!(a, dir.path().join("a").join("b").join("c.txt"));
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        assert!(matches!(store.resolve("/../etc/passwd"), Err(Error::InvalidPath(_))));
        assert!(matches!(store.resolve("a/../../b"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_write_creates_ancestors_and_overwrites() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.write_text("/docs/notes/today.txt", "first").unwrap();
        store.write_text("/docs/notes/today.txt", "second").unwrap();

        let content = fs::read_to_string(dir.path().join("docs/notes/today.txt")).unwrap();
        assert_eq!(content, "second");
    }

    #[test]
    fn test_binary_write_passes_bytes_through() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        let bytes = vec![0u8, 159, 146, 150, 255];
        store.write_bytes("/bin/blob", &bytes).unwrap();
        assert_eq!(fs::read(dir.path().join("bin/blob")).unwrap(), bytes);
    }

    #[test]
    fn test_create_dir_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.create_dir("/x/y/z").unwrap();
        store.create_dir("/x/y/z").unwrap();
        store.create_dir("/").unwrap();
        assert!(dir.path().join("x/y/z").is_dir());
    }

    #[test]
    fn test_delete_missing_path_is_noop() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.delete("/ghost").unwrap();
        store.delete("/ghost").unwrap();
        assert!(!dir.path().join("ghost").exists());
    }

    #[test]
    fn test_delete_directory_recursively() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.write_text("/tree/a/one.txt", "1").unwrap();
        store.write_text("/tree/b/c/two.txt", "2").unwrap();
        store.delete("/tree").unwrap();
        assert!(!dir.path().join("tree").exists());
        assert!(dir.path().exists());

        store.write_text("/single.txt", "s").unwrap();
        store.delete("single.txt").unwrap();
        assert!(!dir.path().join("single.txt").exists());
    }

    #[test]
    fn test_root_cannot_be_written_or_deleted() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        assert!(matches!(store.delete("/"), Err(Error::InvalidPath(_))));
        assert!(matches!(store.write_text("", "x"), Err(Error::InvalidPath(_))));
        assert!(dir.path().exists());
    }

    #[test]
    fn test_execute_write_rejects_invalid_utf8() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        let op = Operation::new(Command::Write, "/bad.txt", Some(vec![0xff, 0xfe]));
        assert!(matches!(store.execute(&op), Err(Error::Storage { .. })));

        let op = Operation::new(Command::Transfer, "/ok.bin", Some(vec![0xff, 0xfe]));
        store.execute(&op).unwrap();
        assert_eq!(fs::read(dir.path().join("ok.bin")).unwrap(), vec![0xff, 0xfe]);
    }
}
