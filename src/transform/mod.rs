// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! File transforms
//!
//! A transform takes the list of assets produced by the previous step and
//! returns a new list. Tasks chain them in declaration order.

mod command;
mod concat;
mod rename;

pub use command::CommandTransform;
pub use concat::ConcatTransform;
pub use rename::{BannerTransform, RenameTransform};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::errors::AssetflowError;
use crate::pipeline::Step;

/// A file flowing through a transform chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path relative to the glob base (and later to the destination)
    pub path: PathBuf,

    /// File content
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Content as UTF-8 text, if it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}

/// Failure of a single transform step
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransformError {
    /// Step that failed
    pub step: String,

    /// What went wrong
    pub message: String,

    /// Hint for fixing it
    pub help: Option<String>,
}

impl TransformError {
    pub fn new(step: &str, message: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            message: message.into(),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach the owning task, producing a pipeline error
    pub fn into_task_error(self, task: &str) -> AssetflowError {
        AssetflowError::TransformFailed {
            task: task.to_string(),
            step: self.step,
            message: self.message,
            help: self.help,
        }
    }
}

/// Trait for transform steps
#[async_trait]
pub trait Transform: Send + Sync {
    /// Step name used in logs and errors
    fn name(&self) -> &str;

    /// Check that everything the step needs is available
    fn check_available(&self) -> Result<(), AssetflowError> {
        Ok(())
    }

    /// Apply the step to the current asset list
    async fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>, TransformError>;
}

/// Create the transform implementing a configured step
pub fn create_transform(step: &Step) -> Box<dyn Transform> {
    match step {
        Step::Concat { file, separator } => {
            Box::new(ConcatTransform::new(file.clone(), separator.clone()))
        }
        Step::Command {
            command,
            shell,
            extension,
        } => Box::new(CommandTransform::new(
            command.clone(),
            shell.clone(),
            extension.clone(),
        )),
        Step::Rename { extension, file } => {
            Box::new(RenameTransform::new(extension.clone(), file.clone()))
        }
        Step::Banner { text } => Box::new(BannerTransform::new(text.clone())),
    }
}

/// Run assets through every step in order
pub async fn apply_chain(
    transforms: &[Box<dyn Transform>],
    mut assets: Vec<Asset>,
) -> Result<Vec<Asset>, TransformError> {
    for transform in transforms {
        tracing::debug!(step = transform.name(), files = assets.len(), "applying step");
        assets = transform.apply(assets).await?;
    }
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chain_applies_steps_in_order() {
        let transforms = vec![
            create_transform(&Step::Banner {
                text: "/* header */".into(),
            }),
            create_transform(&Step::Concat {
                file: "all.css".into(),
                separator: "\n".into(),
            }),
        ];

        let assets = vec![Asset::new("a.css", "a{}"), Asset::new("b.css", "b{}")];
        let out = apply_chain(&transforms, assets).await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, PathBuf::from("all.css"));
        assert_eq!(out[0].text(), Some("/* header */\na{}\n/* header */\nb{}"));
    }

    #[test]
    fn test_transform_error_into_task_error() {
        let err = TransformError::new("command", "exit status 1")
            .with_help("check the input")
            .into_task_error("scss");

        match err {
            AssetflowError::TransformFailed {
                task, step, help, ..
            } => {
                assert_eq!(task, "scss");
                assert_eq!(step, "command");
                assert_eq!(help.as_deref(), Some("check the input"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
