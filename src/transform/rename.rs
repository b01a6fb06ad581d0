// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Path and header transforms

use async_trait::async_trait;

use super::{Asset, Transform, TransformError};

/// Changes the extension and/or file name of every asset
pub struct RenameTransform {
    extension: Option<String>,
    file: Option<String>,
}

impl RenameTransform {
    pub fn new(extension: Option<String>, file: Option<String>) -> Self {
        Self { extension, file }
    }
}

#[async_trait]
impl Transform for RenameTransform {
    fn name(&self) -> &str {
        "rename"
    }

    async fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>, TransformError> {
        Ok(assets
            .into_iter()
            .map(|mut asset| {
                if let Some(file) = &self.file {
                    asset.path.set_file_name(file);
                }
                if let Some(ext) = &self.extension {
                    asset.path.set_extension(ext);
                }
                asset
            })
            .collect())
    }
}

/// Prepends a header line to every text asset
pub struct BannerTransform {
    text: String,
}

impl BannerTransform {
    pub fn new(text: String) -> Self {
        Self { text }
    }
}

#[async_trait]
impl Transform for BannerTransform {
    fn name(&self) -> &str {
        "banner"
    }

    async fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>, TransformError> {
        assets
            .into_iter()
            .map(|asset| {
                if asset.text().is_none() {
                    return Err(TransformError::new(
                        "banner",
                        format!("{} is not a text file", asset.path.display()),
                    ));
                }

                let mut contents = Vec::with_capacity(self.text.len() + 1 + asset.contents.len());
                contents.extend_from_slice(self.text.as_bytes());
                contents.push(b'\n');
                contents.extend(asset.contents);

                Ok(Asset {
                    path: asset.path,
                    contents,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_rename_extension_and_file() {
        let out = RenameTransform::new(Some("min.js".into()), None)
            .apply(vec![Asset::new("js/app.js", "x")])
            .await
            .unwrap();
        assert_eq!(out[0].path, PathBuf::from("js/app.min.js"));

        let out = RenameTransform::new(None, Some("bundle.js".into()))
            .apply(vec![Asset::new("js/app.js", "x")])
            .await
            .unwrap();
        assert_eq!(out[0].path, PathBuf::from("js/bundle.js"));
    }

    #[tokio::test]
    async fn test_banner_rejects_binary() {
        let err = BannerTransform::new("/*! v1 */".into())
            .apply(vec![Asset::new("logo.png", vec![0xff, 0xfe, 0x00])])
            .await
            .unwrap_err();
        assert!(err.message.contains("logo.png"));
    }
}
