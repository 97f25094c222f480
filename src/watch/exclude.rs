// src/watch/exclude.rs

//! Exclusion filtering.
//!
//! An exclusion entry removes a path when any of these hold:
//! - the path equals the entry;
//! - the path ends with the entry, compared component by component
//!   (`src/vendor` excludes `/proj/src/vendor`);
//! - the entry is absolute and the path lies below it;
//! - a component of the path (below the working directory) equals the
//!   entry's basename, so `node_modules` drops every nested occurrence and
//!   everything inside it.
//!
//! Entries containing glob metacharacters are expanded against the tree at
//! startup like watch patterns, and are also kept as a compiled matcher so
//! paths created later are still caught.

use std::collections::HashSet;
use std::ffi::OsString;
use std::hash::Hash;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::{ReliveError, Result};
use crate::fs::FileSystem;
use crate::watch::path_utils::{has_glob_meta, normalize, relative_str};
use crate::watch::patterns::glob_matches;

/// Built-in exclusions: VCS, editor/IDE and OS metadata, dependency trees.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "node_modules",
    ".idea",
    ".cache",
    ".vscode",
    ".DS_Store",
    ".gitignore",
    ".gitmodules",
    ".gitattributes",
    ".travis.yml",
    "vendor",
];

/// Remove duplicates, keeping the first occurrence of each item.
pub fn unique<T: Eq + Hash + Clone>(list: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(list.len());
    list.iter()
        .filter(|item| seen.insert((*item).clone()))
        .cloned()
        .collect()
}

/// Drop every entry of `list` that `exclude` rejects.
pub fn filter(list: &[PathBuf], exclude: &ExcludeSet) -> Vec<PathBuf> {
    list.iter()
        .filter(|p| !exclude.is_excluded(p))
        .cloned()
        .collect()
}

/// One literal exclusion, with its basename cached.
#[derive(Debug, Clone)]
struct ExcludeEntry {
    path: PathBuf,
    basename: Option<OsString>,
}

impl ExcludeEntry {
    fn new(path: PathBuf) -> Self {
        let basename = match path.components().next_back() {
            Some(Component::Normal(name)) => Some(name.to_os_string()),
            _ => None,
        };
        Self { path, basename }
    }

    fn matches(&self, path: &Path, scoped: &Path) -> bool {
        if path == self.path || path.ends_with(&self.path) {
            return true;
        }
        if self.path.is_absolute() && path.starts_with(&self.path) {
            return true;
        }
        match self.basename {
            Some(ref name) => scoped
                .components()
                .any(|c| matches!(c, Component::Normal(part) if part == name.as_os_str())),
            None => false,
        }
    }
}

/// The normalised, deduplicated set of exclusions.
#[derive(Debug, Clone)]
pub struct ExcludeSet {
    root: PathBuf,
    entries: Vec<ExcludeEntry>,
    globs: Option<GlobSet>,
}

impl ExcludeSet {
    /// Build the set from user entries, plus [`DEFAULT_EXCLUDES`] when
    /// `with_defaults` is set.
    ///
    /// Fails with `InvalidPattern` if a glob-shaped entry does not compile.
    pub fn build(
        fs: &dyn FileSystem,
        root: &Path,
        user: &[String],
        with_defaults: bool,
    ) -> Result<Self> {
        let root = normalize(root);
        let defaults = DEFAULT_EXCLUDES
            .iter()
            .filter(|_| with_defaults)
            .map(|s| s.to_string());
        let raw: Vec<String> = user
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .chain(defaults)
            .collect();

        let mut paths: Vec<PathBuf> = Vec::new();
        let mut globs = GlobSetBuilder::new();
        let mut glob_count = 0usize;

        for entry in unique(&raw) {
            if has_glob_meta(&entry) {
                let glob = GlobBuilder::new(&entry)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| ReliveError::InvalidPattern {
                        pattern: entry.clone(),
                        reason: e.kind().to_string(),
                    })?;
                globs.add(glob);
                glob_count += 1;
                paths.extend(glob_matches(fs, &root, &entry)?);
            } else {
                paths.push(PathBuf::from(entry));
            }
        }

        let globs = if glob_count == 0 {
            None
        } else {
            Some(globs.build().map_err(|e| ReliveError::InvalidPattern {
                pattern: raw.join(","),
                reason: e.to_string(),
            })?)
        };

        let entries = unique(&paths).into_iter().map(ExcludeEntry::new).collect();
        Ok(Self {
            root,
            entries,
            globs,
        })
    }

    /// The literal and expanded entries, in insertion order.
    pub fn entries(&self) -> Vec<&Path> {
        self.entries.iter().map(|e| e.path.as_path()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.globs.is_none()
    }

    /// True if `path` should be ignored, both at startup and for every
    /// incoming change event.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let scoped = path.strip_prefix(&self.root).unwrap_or(path);
        if self.entries.iter().any(|e| e.matches(path, scoped)) {
            return true;
        }

        let Some(ref globs) = self.globs else {
            return false;
        };
        if globs.is_match(path) {
            return true;
        }
        // Check the root-relative path and each of its ancestors so a glob
        // matching a directory also covers its contents.
        relative_str(&self.root, path).is_some_and(|rel| {
            Path::new(&rel)
                .ancestors()
                .filter(|a| !a.as_os_str().is_empty())
                .any(|a| globs.is_match(a))
        })
    }
}
