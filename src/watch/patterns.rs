// src/watch/patterns.rs

//! Expansion of user patterns into the concrete set of paths to watch.
//!
//! Patterns are anchored at the working directory and matched with
//! `globset`, where `*` stops at `/` and `**` crosses directories. The tree
//! walk never follows symbolic links: a link is reported as an entry of its
//! own but never descended into, so link cycles cannot trap the walk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};

use crate::errors::{ReliveError, Result};
use crate::fs::FileSystem;
use crate::watch::path_utils::{anchor, anchor_glob, has_glob_meta, normalize};

/// The pattern that stands for the working directory itself.
pub const CWD_PATTERN: &str = ".";

/// Switches that shape the expansion.
#[derive(Debug, Clone, Copy)]
pub struct ExpandOptions {
    /// Append the working directory if no pattern produced it.
    pub watch_cwd: bool,
    /// Add every entry below each matched directory.
    pub recursive: bool,
}

/// Compile anchored glob text into a matcher.
///
/// `original` is the user-facing spelling used in the error message.
pub fn compile_glob(text: &str, original: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(text)
        .literal_separator(true)
        .build()
        .map_err(|e| ReliveError::InvalidPattern {
            pattern: original.to_string(),
            reason: e.kind().to_string(),
        })?;
    Ok(glob.compile_matcher())
}

/// Resolve a single pattern against the filesystem.
///
/// Literal patterns yield themselves when they exist. Glob patterns are
/// evaluated by walking from their literal prefix, no deeper than the glob
/// can reach. The result is sorted.
pub fn glob_matches(fs: &dyn FileSystem, root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !has_glob_meta(pattern) {
        let anchored = anchor(root, pattern);
        let exists = fs.exists(&anchored) || fs.is_symlink(&anchored);
        return Ok(if exists { vec![anchored] } else { Vec::new() });
    }

    let glob = anchor_glob(root, pattern);
    let matcher = compile_glob(&glob.text, pattern)?;
    if !fs.is_dir(&glob.base) {
        debug!(pattern, base = ?glob.base, "glob base does not exist; no matches");
        return Ok(Vec::new());
    }

    let mut matches: Vec<PathBuf> = walk_tree(fs, &glob.base, glob.depth)
        .into_iter()
        .filter(|p| matcher.is_match(p))
        .collect();
    matches.sort();
    Ok(matches)
}

/// Every entry below `dir` (files, directories and links), `dir` excluded.
///
/// `max_depth = Some(1)` lists only direct children. Unreadable directories
/// are logged and skipped. Each path is visited at most once.
pub fn walk_tree(fs: &dyn FileSystem, dir: &Path, max_depth: Option<usize>) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    visited.insert(dir.to_path_buf());

    let mut stack = vec![(dir.to_path_buf(), 0usize)];
    while let Some((current, depth)) = stack.pop() {
        if max_depth.is_some_and(|max| depth >= max) {
            continue;
        }

        let entries = match fs.read_dir(&current) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = ?current, error = %err, "skipping unreadable directory");
                continue;
            }
        };

        for entry in entries {
            if !visited.insert(entry.clone()) {
                continue;
            }
            if fs.is_dir(&entry) && !fs.is_symlink(&entry) {
                stack.push((entry.clone(), depth + 1));
            }
            found.push(entry);
        }
    }

    found.sort();
    found
}

/// Ordered, duplicate-free accumulator for the watch set.
#[derive(Debug, Default)]
struct WatchSetBuilder {
    entries: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl WatchSetBuilder {
    fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    fn add(&mut self, path: PathBuf) {
        if self.seen.insert(path.clone()) {
            self.entries.push(path);
        }
    }

    /// Add `path` and, when it is a real directory and recursion is on,
    /// everything below it.
    fn add_tree(&mut self, fs: &dyn FileSystem, path: PathBuf, recursive: bool) {
        let descend = recursive && fs.is_dir(&path) && !fs.is_symlink(&path);
        if descend {
            let below = walk_tree(fs, &path, None);
            self.add(path);
            for entry in below {
                self.add(entry);
            }
        } else {
            self.add(path);
        }
    }
}

/// Expand user patterns into the watch set.
///
/// - `.` adds the working directory (and its tree when recursive).
/// - Any other pattern is anchored at `root` and glob-expanded; each match
///   not yet present is added, with its tree when it is a directory and
///   recursion is on.
/// - If nothing added the working directory and `watch_cwd` is set, it is
///   appended last.
///
/// Fails with `InvalidPattern` on the first malformed glob; nothing partial
/// is returned.
pub fn expand_patterns(
    fs: &dyn FileSystem,
    root: &Path,
    patterns: &[String],
    options: ExpandOptions,
) -> Result<Vec<PathBuf>> {
    let root = normalize(root);
    let mut set = WatchSetBuilder::default();
    let mut root_added = false;

    for pattern in patterns.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if pattern == CWD_PATTERN {
            set.add_tree(fs, root.clone(), options.recursive);
            root_added = true;
            continue;
        }

        let matches = glob_matches(fs, &root, pattern)?;
        if matches.is_empty() {
            warn!(pattern, "pattern matched nothing");
        }
        for m in matches {
            if m == root {
                root_added = true;
            }
            if !set.contains(&m) {
                set.add_tree(fs, m, options.recursive);
            }
        }
    }

    if !root_added && options.watch_cwd {
        set.add_tree(fs, root, options.recursive);
    }

    Ok(set.entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/main.go");
        fs.add_file("/proj/src/a.go");
        fs.add_file("/proj/src/b.txt");
        fs.add_file("/proj/src/pkg/c.go");
        fs.add_file("/proj/docs/readme.md");
        fs
    }

    fn opts(watch_cwd: bool, recursive: bool) -> ExpandOptions {
        ExpandOptions { watch_cwd, recursive }
    }

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn literal_directory_is_expanded_recursively() {
        let fs = project();
        let set = expand_patterns(&fs, Path::new("/proj"), &["src".into()], opts(false, true))
            .unwrap();
        assert_eq!(
            set,
            paths(&[
                "/proj/src",
                "/proj/src/a.go",
                "/proj/src/b.txt",
                "/proj/src/pkg",
                "/proj/src/pkg/c.go",
            ])
        );
    }

    #[test]
    fn recursion_off_keeps_only_the_match() {
        let fs = project();
        let set = expand_patterns(&fs, Path::new("/proj"), &["src".into()], opts(false, false))
            .unwrap();
        assert_eq!(set, paths(&["/proj/src"]));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let fs = project();
        let set = expand_patterns(&fs, Path::new("/proj"), &["src/*.go".into()], opts(false, true))
            .unwrap();
        assert_eq!(set, paths(&["/proj/src/a.go"]));
    }

    #[test]
    fn double_star_reaches_nested_files() {
        let fs = project();
        let set =
            expand_patterns(&fs, Path::new("/proj"), &["**/*.go".into()], opts(false, true))
                .unwrap();
        assert_eq!(
            set,
            paths(&["/proj/main.go", "/proj/src/a.go", "/proj/src/pkg/c.go"])
        );
    }

    #[test]
    fn dot_adds_root_and_suppresses_watch_cwd_append() {
        let fs = project();
        let set = expand_patterns(&fs, Path::new("/proj"), &[".".into()], opts(true, false))
            .unwrap();
        assert_eq!(set, paths(&["/proj"]));
    }

    #[test]
    fn watch_cwd_appends_root_last() {
        let fs = project();
        let set = expand_patterns(&fs, Path::new("/proj"), &["docs".into()], opts(true, false))
            .unwrap();
        assert_eq!(set, paths(&["/proj/docs", "/proj"]));
    }

    #[test]
    fn overlapping_patterns_do_not_duplicate() {
        let fs = project();
        let set = expand_patterns(
            &fs,
            Path::new("/proj"),
            &["src/pkg".into(), "src".into(), "src/a.go".into()],
            opts(false, true),
        )
        .unwrap();
        let unique: HashSet<_> = set.iter().collect();
        assert_eq!(unique.len(), set.len());
        assert_eq!(set[0], PathBuf::from("/proj/src/pkg"));
        assert!(set.contains(&PathBuf::from("/proj/src/b.txt")));
    }

    #[test]
    fn malformed_glob_is_an_invalid_pattern_error() {
        let fs = project();
        let err = expand_patterns(&fs, Path::new("/proj"), &["src/[a-".into()], opts(false, true))
            .unwrap_err();
        assert!(matches!(err, ReliveError::InvalidPattern { ref pattern, .. } if pattern == "src/[a-"));
    }

    #[test]
    fn missing_literal_matches_nothing() {
        let fs = project();
        let set = expand_patterns(&fs, Path::new("/proj"), &["nope".into()], opts(false, true))
            .unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn symlinked_directories_are_listed_but_not_descended() {
        let fs = project();
        fs.add_symlink("/proj/src/loop", "/proj");
        let set = expand_patterns(&fs, Path::new("/proj"), &["src".into()], opts(false, true))
            .unwrap();
        assert!(set.contains(&PathBuf::from("/proj/src/loop")));
        assert!(!set.iter().any(|p| p.starts_with("/proj/src/loop/")));
    }

    #[test]
    fn root_with_brackets_matches_literally() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/site[1]/a.go");
        fs.add_file("/work/site[1]/src/b.go");
        fs.add_file("/work/site1/c.go");
        let root = Path::new("/work/site[1]");

        let set = expand_patterns(&fs, root, &["*.go".into()], opts(false, true)).unwrap();
        assert_eq!(set, paths(&["/work/site[1]/a.go"]));

        let set = expand_patterns(&fs, root, &["**/*.go".into()], opts(false, true)).unwrap();
        assert_eq!(set, paths(&["/work/site[1]/a.go", "/work/site[1]/src/b.go"]));
    }

    #[test]
    fn walk_respects_depth_limit() {
        let fs = project();
        let shallow = walk_tree(&fs, Path::new("/proj"), Some(1));
        assert_eq!(
            shallow,
            paths(&["/proj/docs", "/proj/main.go", "/proj/src"])
        );
    }
}
