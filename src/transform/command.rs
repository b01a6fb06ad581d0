// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! External command transform
//!
//! Pipes each asset through a shell command: the file goes in on stdin, the
//! transformed file comes back on stdout. This is how compilers and
//! minifiers (sass, terser, cleancss, imagemin) plug into a task.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Asset, Transform, TransformError};
use crate::errors::AssetflowError;
use crate::pipeline::command_program;

/// Shell command transform
pub struct CommandTransform {
    command: String,
    shell: String,
    extension: Option<String>,
}

impl CommandTransform {
    /// Create a new command transform
    pub fn new(command: String, shell: String, extension: Option<String>) -> Self {
        Self {
            command,
            shell,
            extension,
        }
    }

    async fn run_one(&self, asset: Asset) -> Result<Asset, TransformError> {
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TransformError::new("command", format!("failed to start '{}': {}", self.shell, e))
                    .with_help(format!("Shell '{}' may not be available", self.shell))
            })?;

        // Feed stdin from a separate task so a full stdout pipe cannot deadlock us
        let mut stdin = child.stdin.take().ok_or_else(|| {
            TransformError::new("command", "child process has no stdin")
        })?;
        let input = asset.contents;
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await.map_err(|e| {
            TransformError::new("command", format!("'{}' failed: {}", self.command, e))
        })?;

        // A command may exit without reading all of stdin; only its exit status matters
        if let Ok(Err(e)) = writer.await {
            tracing::debug!(command = %self.command, error = %e, "stdin closed early");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());

            let mut err = TransformError::new(
                "command",
                format!(
                    "'{}' exited with {} while processing {}",
                    self.command,
                    code,
                    asset.path.display()
                ),
            );
            if !stderr.is_empty() {
                err = err.with_help(stderr);
            }
            return Err(err);
        }

        let mut path = asset.path;
        if let Some(ext) = &self.extension {
            path.set_extension(ext);
        }

        Ok(Asset {
            path,
            contents: output.stdout,
        })
    }
}

#[async_trait]
impl Transform for CommandTransform {
    fn name(&self) -> &str {
        "command"
    }

    fn check_available(&self) -> Result<(), AssetflowError> {
        let Some(program) = command_program(&self.command) else {
            return Err(AssetflowError::InvalidConfig {
                reason: "command step has an empty command".to_string(),
                help: None,
            });
        };

        which::which(program)
            .map(|_| ())
            .map_err(|_| AssetflowError::tool_not_found(program))
    }

    async fn apply(&self, assets: Vec<Asset>) -> Result<Vec<Asset>, TransformError> {
        let mut out = Vec::with_capacity(assets.len());
        for asset in assets {
            out.push(self.run_one(asset).await?);
        }
        Ok(out)
    }
}
