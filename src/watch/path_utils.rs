// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Component, Path, PathBuf};

/// Characters that turn a pattern into a glob expression.
const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// True if `s` contains any glob metacharacter.
pub fn has_glob_meta(s: &str) -> bool {
    s.contains(GLOB_META)
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if `path` does not live under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// Lexically normalise a path: drop `.` components and fold `..` into the
/// preceding component. The filesystem is not consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Anchor `pattern` at `root` (unless it is already absolute) and normalise.
pub fn anchor(root: &Path, pattern: &str) -> PathBuf {
    normalize(&root.join(pattern))
}

/// A user glob anchored at the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredGlob {
    /// Glob text. Components that come from the working directory are
    /// escaped, so a root like `site[1]` is matched literally.
    pub text: String,
    /// Longest literal directory prefix; the walk starts here.
    pub base: PathBuf,
    /// Components below `base` the glob can reach, `None` when a `**`
    /// component makes it unbounded.
    pub depth: Option<usize>,
}

/// Anchor `pattern` at `root` and split it into walk base and depth.
///
/// `/proj` + `src/*/main.go` -> base `/proj/src`, depth `Some(2)`
/// `/proj` + `src/**/*.go`   -> base `/proj/src`, depth `None`
pub fn anchor_glob(root: &Path, pattern: &str) -> AnchoredGlob {
    let anchored = anchor(root, pattern);
    let from_root = if Path::new(pattern).is_absolute() {
        0
    } else {
        normalize(root)
            .components()
            .zip(anchored.components())
            .take_while(|(a, b)| a == b)
            .count()
    };

    let mut text = PathBuf::new();
    let mut base = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();

    for (i, component) in anchored.components().enumerate() {
        let part = component.as_os_str().to_string_lossy();
        let literal = i < from_root;
        if literal {
            text.push(globset::escape(&part));
        } else {
            text.push(part.as_ref());
        }

        if rest.is_empty() && (literal || !has_glob_meta(&part)) {
            base.push(component.as_os_str());
        } else {
            rest.push(part.into_owned());
        }
    }

    let depth = if rest.iter().any(|c| c.contains("**")) {
        None
    } else {
        Some(rest.len())
    };
    AnchoredGlob {
        text: text.to_string_lossy().replace('\\', "/"),
        base,
        depth,
    }
}
