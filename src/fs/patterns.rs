// src/fs/patterns.rs

//! Glob handling for file dependencies and generator discovery.
//!
//! Patterns are matched against paths relative to a base directory, with
//! forward slashes. Listing only reads directories; file contents are never
//! touched.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;

/// Whether `s` contains glob metacharacters.
pub fn is_glob(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Convert a path into a string relative to `root`, with forward slashes.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let root = normalize(root);
    let path = normalize(path);
    let rel = if root == Path::new(".") {
        path.as_path()
    } else {
        path.strip_prefix(&root).ok()?
    };
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// Collect all files under `root` whose relative path matches `set`.
///
/// With `recursive = false` only the direct children of `root` are
/// considered. The result is sorted so callers get a stable order.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    set: &GlobSet,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                if recursive {
                    stack.push(path);
                }
            } else if fs.is_file(&path) {
                if let Some(rel_str) = relative_str(root, &path) {
                    if set.is_match(&rel_str) {
                        files.push(normalize(&path));
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Expand a single glob pattern (relative to `base`) into matching files.
///
/// The directory part before the first metacharacter is used as the listing
/// root, so `src/js/*.ts` lists `src/js` only, while `lib/**/*.py` walks
/// `lib` recursively. A root that does not exist matches nothing.
pub fn expand_glob(fs: &dyn FileSystem, base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let (prefix, rest) = split_literal_prefix(pattern);
    let root = normalize(&base.join(prefix));
    if !fs.is_dir(&root) {
        return Ok(Vec::new());
    }

    let set = build_globset(&[rest.to_string()])?;
    let recursive = rest.contains('/') || rest.contains("**");
    collect_matching_files(fs, &root, &set, recursive)
}

/// Split `a/b/*.c` into (`a/b`, `*.c`).
fn split_literal_prefix(pattern: &str) -> (&str, &str) {
    let first_meta = pattern.find(['*', '?', '[']).unwrap_or(pattern.len());
    match pattern[..first_meta].rfind('/') {
        Some(idx) => (&pattern[..idx], &pattern[idx + 1..]),
        None => ("", pattern),
    }
}

/// Lexically normalise a path: drop `.` components and fold `..` where a
/// preceding normal component exists. No filesystem access.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
