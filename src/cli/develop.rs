// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Develop command - pre-build, serve with live reload, rebuild on change

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use super::run::{ensure_tools, ensure_valid};
use super::{current_dir, load_definition};
use crate::errors::AssetflowResult;
use crate::pipeline::{format_duration, PipelineDefinition, Sequencer};
use crate::server::DevServer;
use crate::tasks::{TaskExecutor, TaskRunner};
use crate::watch::WatchRegistrar;

/// Run the develop pipeline until Ctrl+C
pub async fn run(config: PathBuf, port: Option<u16>, verbose: bool) -> Result<()> {
    let mut definition = load_definition(&config)?;
    if let Some(port) = port {
        definition.develop.server.port = port;
    }

    ensure_valid(&definition, verbose)?;
    ensure_tools(&definition, &definition.develop_group())?;

    let root = current_dir()?;
    let (reload, _) = broadcast::channel(16);
    let definition = Arc::new(definition);
    let executor: Arc<dyn TaskRunner> = Arc::new(
        TaskExecutor::new(definition.clone(), root.clone()).with_reload(reload.clone()),
    );

    run_develop_tasks(&definition, executor.clone()).await?;

    let server = DevServer::start(&definition.develop.server, &root, reload).await?;

    let mut registrar = WatchRegistrar::new(
        &root,
        Duration::from_millis(definition.develop.debounce_ms),
    );
    for binding in &definition.develop.watch {
        registrar.register(&binding.patterns, binding.task.clone())?;
        if verbose {
            println!(
                "  {} {} {} {}",
                "→".blue(),
                binding.patterns.patterns().join(", "),
                "→".dimmed(),
                binding.task
            );
        }
    }
    let watcher = registrar.start(executor)?;

    println!();
    println!(
        "{} http://{}",
        "Serving on".green().bold(),
        server.local_addr()
    );
    println!("{}", "Press Ctrl+C to stop".dimmed());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| miette::miette!("Failed to listen for Ctrl+C: {}", e))?;

    println!();
    println!("{}", "Shutting down...".yellow());
    watcher.stop();
    server.stop().await;

    Ok(())
}

/// Run the develop pre-tasks
///
/// A failing task is reported and the session carries on; the watcher
/// re-runs it on the next change. Returns whether every task succeeded.
pub(crate) async fn run_develop_tasks(
    definition: &PipelineDefinition,
    runner: Arc<dyn TaskRunner>,
) -> AssetflowResult<bool> {
    let groups = definition.develop_group();
    if groups.is_empty() {
        return Ok(true);
    }

    let sequencer = Sequencer::new(definition, runner)?;
    match sequencer.run(&groups).await {
        Ok(report) => {
            println!(
                "  {} {} {}",
                "✓".green(),
                "Develop tasks finished".bold(),
                format_duration(report.duration).dimmed()
            );
            Ok(true)
        }
        Err(e) => {
            let task = e.failed_task().unwrap_or("develop").to_string();
            eprintln!("  {} {}", "✗".red(), format!("Task '{}' failed:", task).red().bold());
            eprintln!("    {}", e.to_string().dimmed());
            tracing::error!("'{}' errored: {}", task, e);
            Ok(false)
        }
    }
}
