// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Clean task: remove a build directory tree

use std::io::ErrorKind;
use std::path::Path;

use crate::errors::AssetflowError;

/// Remove `target` recursively. A missing target is not an error.
///
/// Returns whether anything was removed.
pub async fn run(target: &Path) -> Result<bool, AssetflowError> {
    let metadata = match tokio::fs::symlink_metadata(target).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(target = %target.display(), "nothing to clean");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(target).await
    } else {
        tokio::fs::remove_file(target).await
    };

    match result {
        Ok(()) => Ok(true),
        // Removed concurrently by someone else
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AssetflowError::FileWrite {
            path: target.to_path_buf(),
            error: e.to_string(),
        }),
    }
}
