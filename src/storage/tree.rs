//! Read-only traversal of the storage root for display

use std::io;
use std::path::Path;

use serde::Serialize;
use tracing::trace;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// One entry of the local tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    /// Path relative to the root, `/`-separated, without leading separator
    pub path: String,
    /// Nesting level below the root (top-level entries are 1)
    pub depth: usize,
    pub is_dir: bool,
}

impl TreeEntry {
    /// Final path segment
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Walk everything below `root`, directories before their contents,
/// siblings in name order. Entries that disappear mid-walk are skipped.
pub(crate) fn walk(root: &Path) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            // Removed by a concurrent delete while walking
            Err(e) if e.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => {
                trace!("Skipping vanished entry {:?}", e.path());
                continue;
            }
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                return Err(Error::storage(path, e.into()));
            }
        };

        let relative = match entry.path().strip_prefix(root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };

        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        entries.push(TreeEntry {
            path,
            depth: entry.depth(),
            is_dir: entry.file_type().is_dir(),
        });
    }

    Ok(entries)
}

/// Render a tree listing, two spaces of indent per level and a trailing
/// `/` on directories.
pub fn render_tree(root_label: &str, entries: &[TreeEntry]) -> String {
    let mut out = format!("{}/\n", root_label.trim_end_matches('/'));
    for entry in entries {
        out.push_str(&"  ".repeat(entry.depth));
        out.push_str(entry.name());
        if entry.is_dir {
            out.push('/');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;
    use tempfile::tempdir;

    #[test]
    fn test_walk_lists_nested_paths() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.write_text("/a/b/c.txt", "hi").unwrap();
        store.create_dir("/empty").unwrap();

        let entries = store.list_tree().unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "a/b", "a/b/c.txt", "empty"]);

        let file = entries.iter().find(|e| e.path == "a/b/c.txt").unwrap();
        assert!(!file.is_dir);
        assert_eq!(file.depth, 3);
        assert_eq!(file.name(), "c.txt");
    }

    #[test]
    fn test_walk_skips_entries_removed_mid_walk() {
        let dir = tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.write_text("/a/keep.txt", "k").unwrap();
        for i in 0..50 {
            store.write_text(&format!("/b/{}/f.txt", i), "x").unwrap();
        }

        // Walk while another thread tears down /b
        let root = dir.path().to_path_buf();
        let deleter = std::thread::spawn(move || {
            let _ = std::fs::remove_dir_all(root.join("b"));
        });
        let walked = walk(dir.path());
        deleter.join().unwrap();

        let entries = walked.unwrap();
        assert!(entries.iter().any(|e| e.path == "a/keep.txt"));
    }

    #[test]
    fn test_walk_of_vanished_directory_is_empty() {
        let dir = tempdir().unwrap();
        assert!(walk(&dir.path().join("deleted-meanwhile")).unwrap().is_empty());
    }

    #[test]
    fn test_render_tree() {
        let entries = vec![
            TreeEntry { path: "a".into(), depth: 1, is_dir: true },
            TreeEntry { path: "a/c.txt".into(), depth: 2, is_dir: false },
        ];
        assert_eq!(render_tree("fsroot", &entries), "fsroot/\n  a/\n    c.txt\n");
    }
}
