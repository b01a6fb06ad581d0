// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Task execution
//!
//! [`TaskExecutor`] runs the tasks of a [`PipelineDefinition`] by name. The
//! sequencer and the watch registrar only see the [`TaskRunner`] trait.

pub mod clean;
pub mod inject;
pub mod patterns;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::errors::{AssetflowError, AssetflowResult};
use crate::pipeline::{Action, PipelineDefinition, ReloadScope, Step, TaskDefinition};
use crate::transform::{self, Asset};

/// Result of a successful task run
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// Task name
    pub task: String,

    /// Number of input files the task matched
    pub inputs: usize,

    /// Files written
    pub outputs: Vec<PathBuf>,

    /// Execution duration
    pub duration: Duration,
}

impl TaskOutcome {
    fn new(task: &str, inputs: usize, outputs: Vec<PathBuf>, started: Instant) -> Self {
        Self {
            task: task.to_string(),
            inputs,
            outputs,
            duration: started.elapsed(),
        }
    }
}

/// Something that can run a task by name
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// Run one task (not its dependencies)
    async fn run_task(&self, name: &str) -> AssetflowResult<TaskOutcome>;
}

/// Runs tasks from a pipeline definition against a project root
pub struct TaskExecutor {
    definition: Arc<PipelineDefinition>,
    root: PathBuf,
    reload: Option<broadcast::Sender<ReloadScope>>,
}

impl TaskExecutor {
    /// Create an executor; relative paths in the definition resolve against `root`
    pub fn new(definition: Arc<PipelineDefinition>, root: impl Into<PathBuf>) -> Self {
        Self {
            definition,
            root: root.into(),
            reload: None,
        }
    }

    /// Broadcast reload signals for tasks that declare `reload`
    pub fn with_reload(mut self, reload: broadcast::Sender<ReloadScope>) -> Self {
        self.reload = Some(reload);
        self
    }

    fn task(&self, name: &str) -> AssetflowResult<&TaskDefinition> {
        self.definition
            .get_task(name)
            .ok_or_else(|| AssetflowError::TaskNotFound {
                task: name.to_string(),
                referenced_by: "a run request".to_string(),
            })
    }

    async fn run_transform(
        &self,
        task: &TaskDefinition,
        input: &crate::pipeline::PatternSet,
        steps: &[Step],
        dest: Option<&Path>,
        started: Instant,
    ) -> AssetflowResult<TaskOutcome> {
        let matched = patterns::resolve(input, &self.root)?;

        if matched.is_empty() {
            tracing::debug!(task = %task.name, "no input files matched");
            return Ok(TaskOutcome::new(&task.name, 0, vec![], started));
        }

        let Some(dest) = dest else {
            // Reload-only task: nothing to produce
            return Ok(TaskOutcome::new(&task.name, matched.len(), vec![], started));
        };

        let transforms: Vec<_> = steps.iter().map(transform::create_transform).collect();
        for t in &transforms {
            t.check_available()?;
        }

        let mut assets = Vec::with_capacity(matched.len());
        for file in &matched {
            let contents =
                tokio::fs::read(&file.path)
                    .await
                    .map_err(|e| AssetflowError::FileRead {
                        path: file.path.clone(),
                        error: e.to_string(),
                    })?;
            assets.push(Asset::new(file.relative.clone(), contents));
        }

        let assets = transform::apply_chain(&transforms, assets)
            .await
            .map_err(|e| e.into_task_error(&task.name))?;

        let dest = self.root.join(dest);
        let mut outputs = Vec::with_capacity(assets.len());
        for asset in assets {
            outputs.push(write_asset(&dest, asset).await?);
        }

        Ok(TaskOutcome::new(&task.name, matched.len(), outputs, started))
    }

    fn signal_reload(&self, task: &TaskDefinition) {
        if let (Some(scope), Some(reload)) = (task.reload, &self.reload) {
            // No connected browsers is fine
            let receivers = reload.send(scope).unwrap_or(0);
            tracing::debug!(task = %task.name, %scope, receivers, "reload signalled");
        }
    }
}

#[async_trait]
impl TaskRunner for TaskExecutor {
    async fn run_task(&self, name: &str) -> AssetflowResult<TaskOutcome> {
        let task = self.task(name)?;
        let started = Instant::now();

        let outcome = match &task.action {
            Action::Transform { input, steps, dest } => {
                self.run_transform(task, input, steps, dest.as_deref(), started)
                    .await?
            }
            Action::Clean { target } => {
                clean::run(&self.root.join(target)).await?;
                TaskOutcome::new(&task.name, 0, vec![], started)
            }
            Action::Inject {
                template,
                sources,
                dest,
                ignore_path,
                add_root_slash,
            } => {
                let options = inject::InjectOptions {
                    template,
                    sources,
                    dest,
                    ignore_path: ignore_path.as_deref(),
                    add_root_slash: *add_root_slash,
                };
                let output = inject::run(&self.root, &options).await?;
                TaskOutcome::new(&task.name, 1, vec![output], started)
            }
        };

        self.signal_reload(task);
        Ok(outcome)
    }
}

/// Write an asset below `dest`, creating parent directories
async fn write_asset(dest: &Path, asset: Asset) -> AssetflowResult<PathBuf> {
    let path = dest.join(&asset.path);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AssetflowError::FileWrite {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
    }

    tokio::fs::write(&path, &asset.contents)
        .await
        .map_err(|e| AssetflowError::FileWrite {
            path: path.clone(),
            error: e.to_string(),
        })?;

    tracing::debug!(path = %path.display(), bytes = asset.contents.len(), "wrote asset");
    Ok(path)
}
