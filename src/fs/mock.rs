// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Dir(Vec<String>), // List of child names
    Symlink(PathBuf),
}

/// In-memory tree for exercising expansion without touching the disk.
///
/// Paths are stored exactly as given, so tests should use absolute paths
/// (e.g. `/proj/src/main.go`).
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::File);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.lock();
        ensure_dir_entry(&mut entries, path);
    }

    /// Add a symlink at `path` pointing at `target`. Links are never
    /// followed by the expander, so the target does not need to exist.
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) {
        self.insert(path.as_ref(), MockEntry::Symlink(target.into()));
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let mut entries = self.lock();
        entries.insert(path.to_path_buf(), entry);
        if let Some(parent) = path.parent() {
            ensure_dir_entry(&mut entries, parent);
            link_child(&mut entries, parent, path);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A poisoned mock only happens after a test already panicked.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn target_of(&self, path: &Path) -> Option<MockEntry> {
        let entries = self.lock();
        match entries.get(path) {
            Some(MockEntry::Symlink(target)) => entries.get(target).cloned(),
            other => other.cloned(),
        }
    }
}

fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if path.as_os_str().is_empty() || entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    if let Some(parent) = path.parent() {
        ensure_dir_entry(entries, parent);
        link_child(entries, parent, path);
    }
}

fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
                children.sort();
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.target_of(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.target_of(path), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Symlink(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.target_of(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parents_are_created_implicitly() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/main.go");

        assert!(fs.is_dir(Path::new("/proj")));
        assert!(fs.is_dir(Path::new("/proj/src")));
        assert!(fs.exists(Path::new("/proj/src/main.go")));
        assert!(!fs.is_dir(Path::new("/proj/src/main.go")));
        assert_eq!(
            fs.read_dir(Path::new("/proj")).unwrap(),
            vec![PathBuf::from("/proj/src")]
        );
    }

    #[test]
    fn symlinks_resolve_for_queries_but_are_reported() {
        let fs = MockFileSystem::new();
        fs.add_dir("/proj/real");
        fs.add_symlink("/proj/link", "/proj/real");

        assert!(fs.is_symlink(Path::new("/proj/link")));
        assert!(fs.is_dir(Path::new("/proj/link")));
        assert!(!fs.is_symlink(Path::new("/proj/real")));
    }
}
