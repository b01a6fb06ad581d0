// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Glob resolution
//!
//! Patterns are resolved against the filesystem on every call so newly
//! created files are picked up.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::errors::AssetflowError;
use crate::pipeline::PatternSet;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// A file matched by a pattern set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// Absolute (root-joined) path
    pub path: PathBuf,

    /// Path relative to the pattern's glob base
    pub relative: PathBuf,
}

/// Strip a leading `./` so patterns compare against root-relative paths
pub fn normalize_pattern(pattern: &str) -> &str {
    let mut p = pattern.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p
}

/// The directory part of a pattern before its first wildcard
///
/// `src/contents/css/scss/**/*.scss` has the base `src/contents/css/scss`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let pattern = normalize_pattern(pattern);
    let mut base = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();

    for (i, component) in components.iter().enumerate() {
        let is_last = i + 1 == components.len();
        if is_last || component.contains(GLOB_META) {
            break;
        }
        if component.is_empty() && i == 0 {
            base.push("/");
        } else {
            base.push(component);
        }
    }

    base
}

/// Resolve a pattern set to files, keeping pattern order
///
/// Entries starting with `!` remove earlier matches. Directories are skipped
/// and every file appears at most once.
pub fn resolve(patterns: &PatternSet, root: &Path) -> Result<Vec<MatchedFile>, AssetflowError> {
    let mut files: Vec<MatchedFile> = Vec::new();
    let mut seen = HashSet::new();

    for raw in patterns.patterns() {
        if let Some(negated) = raw.trim().strip_prefix('!') {
            let exclude = glob::Pattern::new(normalize_pattern(negated))?;
            files.retain(|f| {
                let rel = f.path.strip_prefix(root).unwrap_or(&f.path);
                !exclude.matches_path_with(rel, match_options())
            });
            continue;
        }

        let pattern = normalize_pattern(raw);
        if pattern.is_empty() {
            continue;
        }

        let base = root.join(glob_base(pattern));
        let full_pattern = if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            format!(
                "{}/{}",
                glob::Pattern::escape(&root.to_string_lossy()),
                pattern
            )
        };

        let mut matches: Vec<PathBuf> = glob::glob_with(&full_pattern, match_options())?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        matches.sort();

        for path in matches {
            if !seen.insert(path.clone()) {
                continue;
            }
            let relative = path
                .strip_prefix(&base)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| {
                    path.file_name()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| path.clone())
                });
            files.push(MatchedFile { path, relative });
        }
    }

    Ok(files)
}

/// `*` never crosses a directory separator; `**` does
pub fn match_options() -> glob::MatchOptions {
    glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}
