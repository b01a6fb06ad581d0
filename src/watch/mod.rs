// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Watch registrar - re-run tasks when their files change
//!
//! Bindings pair a pattern set with a task name. One debounced recursive
//! watcher covers the base directories of all patterns; every debounced batch
//! of events triggers each matching task once.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::{AssetflowError, AssetflowResult};
use crate::pipeline::{format_duration, PatternSet};
use crate::tasks::patterns::{glob_base, match_options, normalize_pattern};
use crate::tasks::TaskRunner;

/// Compiled patterns of one binding
#[derive(Debug, Clone)]
struct CompiledBinding {
    task: String,
    include: Vec<glob::Pattern>,
    exclude: Vec<glob::Pattern>,
    bases: Vec<PathBuf>,
}

impl CompiledBinding {
    fn compile(patterns: &PatternSet, task: String) -> AssetflowResult<Self> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        let mut bases = Vec::new();

        for raw in patterns.patterns() {
            if let Some(negated) = raw.trim().strip_prefix('!') {
                exclude.push(glob::Pattern::new(normalize_pattern(negated))?);
                continue;
            }
            let pattern = normalize_pattern(raw);
            if pattern.is_empty() {
                continue;
            }
            include.push(glob::Pattern::new(pattern)?);
            bases.push(glob_base(pattern));
        }

        Ok(Self {
            task,
            include,
            exclude,
            bases,
        })
    }

    fn matches(&self, relative: &Path) -> bool {
        let options = match_options();
        self.include
            .iter()
            .any(|p| p.matches_path_with(relative, options))
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_path_with(relative, options))
    }
}

/// Maps changed paths to the tasks bound to them
#[derive(Debug, Clone, Default)]
pub struct WatchMatcher {
    bindings: Vec<CompiledBinding>,
}

impl WatchMatcher {
    /// Tasks whose patterns match any of the root-relative paths
    ///
    /// Each task appears at most once, in registration order.
    pub fn tasks_for(&self, paths: &[PathBuf]) -> Vec<String> {
        let mut tasks: Vec<String> = Vec::new();
        for binding in &self.bindings {
            if tasks.contains(&binding.task) {
                continue;
            }
            if paths.iter().any(|p| binding.matches(p)) {
                tasks.push(binding.task.clone());
            }
        }
        tasks
    }
}

/// Collects watch bindings and starts the watcher
pub struct WatchRegistrar {
    root: PathBuf,
    debounce: Duration,
    matcher: WatchMatcher,
}

impl WatchRegistrar {
    /// Create a registrar; patterns are relative to `root`
    pub fn new(root: impl Into<PathBuf>, debounce: Duration) -> Self {
        let root = root.into();
        // Event paths arrive canonicalized on some platforms
        let root = root.canonicalize().unwrap_or(root);
        Self {
            root,
            debounce,
            matcher: WatchMatcher::default(),
        }
    }

    /// Bind a pattern set to a task
    pub fn register(&mut self, patterns: &PatternSet, task: impl Into<String>) -> AssetflowResult<()> {
        let binding = CompiledBinding::compile(patterns, task.into())?;
        tracing::debug!(task = %binding.task, patterns = ?patterns.patterns(), "registered watch binding");
        self.matcher.bindings.push(binding);
        Ok(())
    }

    /// The matcher built from the registered bindings
    pub fn matcher(&self) -> &WatchMatcher {
        &self.matcher
    }

    /// Directories to watch recursively: nearest existing base of each pattern
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .matcher
            .bindings
            .iter()
            .flat_map(|b| b.bases.iter())
            .map(|base| nearest_existing(&self.root, &self.root.join(base)))
            .collect();

        dirs.sort_by_key(|d| d.components().count());
        let mut roots: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            if !roots.iter().any(|r| dir.starts_with(r)) {
                roots.push(dir);
            }
        }
        roots
    }

    /// Start watching; triggered tasks run through `runner`
    pub fn start(self, runner: Arc<dyn TaskRunner>) -> AssetflowResult<WatchHandle> {
        let (tx, mut rx) = mpsc::unbounded_channel::<DebounceEventResult>();

        let mut debouncer = new_debouncer(self.debounce, move |result: DebounceEventResult| {
            // Receiver gone means the handle was stopped
            let _ = tx.send(result);
        })
        .map_err(|e| AssetflowError::Watch {
            message: format!("failed to create file watcher: {}", e),
        })?;

        for dir in self.watch_roots() {
            debouncer
                .watcher()
                .watch(&dir, RecursiveMode::Recursive)
                .map_err(|e| AssetflowError::Watch {
                    message: format!("failed to watch '{}': {}", dir.display(), e),
                })?;
            tracing::info!("Watching {}", dir.display());
        }

        let root = self.root;
        let matcher = self.matcher;

        let task = tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                let events = match result {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!(error = ?e, "file watch error");
                        continue;
                    }
                };

                let paths: Vec<PathBuf> = events
                    .iter()
                    .filter_map(|event| relative_to_root(&root, &event.path))
                    .collect();

                for task in matcher.tasks_for(&paths) {
                    invoke(runner.as_ref(), &task).await;
                }
            }
            tracing::debug!("watch loop finished");
        });

        Ok(WatchHandle {
            debouncer: Some(debouncer),
            task,
        })
    }
}

/// Run a triggered task; failures are reported and the binding stays active
async fn invoke(runner: &dyn TaskRunner, task: &str) {
    tracing::info!("Starting '{}'...", task);
    match runner.run_task(task).await {
        Ok(outcome) => {
            tracing::info!(
                "Finished '{}' after {}",
                task,
                format_duration(outcome.duration)
            );
        }
        Err(e) => {
            tracing::error!("'{}' errored: {}", task, e);
        }
    }
}

/// Running watcher. Stopping (or dropping) it releases the OS watch handles.
pub struct WatchHandle {
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Stop watching
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(debouncer) = self.debouncer.take() {
            drop(debouncer);
            tracing::debug!("file watcher stopped");
        }
        self.task.abort();
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.debouncer.is_some())
            .finish()
    }
}

/// Path of `path` relative to `root`, if it lies below it
pub fn relative_to_root(root: &Path, path: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_path_buf());
    }

    // Deleted files cannot be canonicalized, but their directory can
    let canonical = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };
    canonical.strip_prefix(root).ok().map(Path::to_path_buf)
}

fn nearest_existing(root: &Path, dir: &Path) -> PathBuf {
    let mut current = dir;
    loop {
        if current.is_dir() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) if parent.starts_with(root) => current = parent,
            _ => return root.to_path_buf(),
        }
    }
}
