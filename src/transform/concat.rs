// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Concatenation transform

use async_trait::async_trait;
use std::path::PathBuf;

use super::{Asset, Transform, TransformError};

/// Merges every asset, in order, into a single file
pub struct ConcatTransform {
    file: String,
    separator: String,
}

impl ConcatTransform {
    pub fn new(file: String, separator: String) -> Self {
        Self { file, separator }
    }
}

#[async_trait]
impl Transform for ConcatTransform {
    fn name(&self) -> &str {
        "concat"
    }

    async fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>, TransformError> {
        if assets.is_empty() {
            return Ok(assets);
        }

        let path = PathBuf::from(&self.file);
        let capacity = assets.iter().map(|a| a.contents.len()).sum::<usize>()
            + self.separator.len() * assets.len();
        let mut contents = Vec::with_capacity(capacity);

        for (i, asset) in assets.into_iter().enumerate() {
            if i > 0 {
                contents.extend_from_slice(self.separator.as_bytes());
            }
            contents.extend(asset.contents);
        }

        Ok(vec![Asset { path, contents }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_concat_keeps_input_order() {
        let concat = ConcatTransform::new("all.js".into(), "\n".into());
        let out = concat
            .apply(vec![
                Asset::new("lib/jquery.js", "var $;"),
                Asset::new("app.js", "run();"),
            ])
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, PathBuf::from("all.js"));
        assert_eq!(out[0].text(), Some("var $;\nrun();"));
    }

    #[tokio::test]
    async fn test_concat_of_nothing_is_nothing() {
        let concat = ConcatTransform::new("all.js".into(), "\n".into());
        assert!(concat.apply(vec![]).await.unwrap().is_empty());
    }
}
