// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline sequencer
//!
//! Runs an ordered list of groups. Tasks inside a group run concurrently,
//! each one starting as soon as its declared dependencies have finished.
//! The first failure stops the pipeline: nothing new is started, tasks
//! already running are awaited and their results dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use crate::errors::{AssetflowError, AssetflowResult};
use crate::pipeline::{DagBuilder, Group, PipelineDefinition};
use crate::tasks::{TaskOutcome, TaskRunner};

/// Outcome of a complete sequencer run
#[derive(Debug, Default)]
pub struct SequenceReport {
    /// Completed tasks in completion order
    pub completed: Vec<TaskOutcome>,

    /// Total execution time
    pub duration: Duration,
}

impl SequenceReport {
    /// Whether the named task ran during this sequence
    pub fn ran(&self, task: &str) -> bool {
        self.completed.iter().any(|o| o.task == task)
    }
}

/// Executes groups of tasks in order through a [`TaskRunner`]
pub struct Sequencer {
    dag: DagBuilder,
    runner: Arc<dyn TaskRunner>,
}

impl Sequencer {
    /// Create a sequencer; fails on unknown dependencies and cycles
    pub fn new(
        definition: &PipelineDefinition,
        runner: Arc<dyn TaskRunner>,
    ) -> AssetflowResult<Self> {
        Ok(Self {
            dag: DagBuilder::build(definition)?,
            runner,
        })
    }

    /// Run groups strictly in order, stopping at the first failure
    pub async fn run(&self, groups: &[Group]) -> AssetflowResult<SequenceReport> {
        let started = Instant::now();

        // Reject unknown names before anything runs
        for group in groups {
            for name in group.names() {
                if !self.dag.contains(name) {
                    return Err(AssetflowError::TaskNotFound {
                        task: name.to_string(),
                        referenced_by: format!("pipeline group {}", group),
                    });
                }
            }
        }

        let mut report = SequenceReport::default();
        let mut completed: HashSet<String> = HashSet::new();

        for group in groups {
            tracing::debug!(%group, "starting group");
            let outcomes = self.run_group(group, &completed).await?;
            for outcome in outcomes {
                completed.insert(outcome.task.clone());
                report.completed.push(outcome);
            }
        }

        report.duration = started.elapsed();
        Ok(report)
    }

    /// Run one group plus any dependencies not completed by earlier groups
    async fn run_group(
        &self,
        group: &Group,
        already_done: &HashSet<String>,
    ) -> AssetflowResult<Vec<TaskOutcome>> {
        let pending = self.expand(group, already_done);

        // Direct dependencies still outstanding for each pending task
        let mut waiting_on: HashMap<String, HashSet<String>> = pending
            .iter()
            .map(|name| {
                let deps = self
                    .dag
                    .dependencies(name)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|d| !already_done.contains(d))
                    .collect();
                (name.clone(), deps)
            })
            .collect();

        let mut not_started: Vec<String> = pending;
        let mut running: JoinSet<(String, AssetflowResult<TaskOutcome>)> = JoinSet::new();
        let mut outcomes = Vec::new();

        loop {
            let (ready, blocked): (Vec<String>, Vec<String>) = not_started
                .into_iter()
                .partition(|name| waiting_on[name].is_empty());
            not_started = blocked;

            for name in ready {
                tracing::info!("Starting '{}'...", name);
                let runner = Arc::clone(&self.runner);
                running.spawn(async move {
                    let result = runner.run_task(&name).await;
                    (name, result)
                });
            }

            let Some(joined) = running.join_next().await else {
                break;
            };

            let (name, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    drain(&mut running).await;
                    return Err(AssetflowError::ExecutionFailed {
                        message: format!("task panicked or was cancelled: {}", e),
                    });
                }
            };

            match result {
                Ok(outcome) => {
                    tracing::info!(
                        "Finished '{}' after {}",
                        name,
                        format_duration(outcome.duration)
                    );
                    for deps in waiting_on.values_mut() {
                        deps.remove(&name);
                    }
                    outcomes.push(outcome);
                }
                Err(e) => {
                    tracing::error!("'{}' errored", name);
                    drain(&mut running).await;
                    return Err(e.in_task(&name));
                }
            }
        }

        if !not_started.is_empty() {
            // Unreachable for a validated DAG
            return Err(AssetflowError::CircularDependency { tasks: not_started });
        }

        Ok(outcomes)
    }

    /// Group members plus their transitive dependencies, minus finished tasks
    fn expand(&self, group: &Group, already_done: &HashSet<String>) -> Vec<String> {
        let mut pending: Vec<String> = Vec::new();

        for name in group.names() {
            let ancestors = self.dag.ancestors(name).unwrap_or_default();
            for candidate in ancestors.into_iter().chain(std::iter::once(name.to_string())) {
                if !already_done.contains(&candidate) && !pending.contains(&candidate) {
                    pending.push(candidate);
                }
            }
        }

        pending
    }
}

/// Let already running tasks finish, ignoring their results
async fn drain(running: &mut JoinSet<(String, AssetflowResult<TaskOutcome>)>) {
    while let Some(joined) = running.join_next().await {
        if let Ok((name, _)) = joined {
            tracing::debug!("'{}' finished after pipeline abort; result ignored", name);
        }
    }
}

/// Human readable duration, gulp style (`12 ms`, `1.4 s`)
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{} ms", millis)
    } else {
        format!("{:.2} s", duration.as_secs_f64())
    }
}
