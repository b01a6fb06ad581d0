// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Run command - execute named tasks

use colored::Colorize;
use miette::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use super::{current_dir, load_definition};
use crate::pipeline::{
    format_duration, DagBuilder, Group, PipelineDefinition, PipelineValidator, Sequencer,
};
use crate::tasks::TaskExecutor;

/// Run the given tasks as one concurrent group
pub async fn run(config: PathBuf, tasks: Vec<String>, verbose: bool) -> Result<()> {
    let definition = load_definition(&config)?;
    let group = match tasks.len() {
        1 => Group::Single(tasks[0].clone()),
        _ => Group::Parallel(tasks),
    };

    execute(definition, &[group], verbose).await
}

/// Validate, check tools, run `groups` and print a summary
pub(crate) async fn execute(
    definition: PipelineDefinition,
    groups: &[Group],
    verbose: bool,
) -> Result<()> {
    ensure_valid(&definition, verbose)?;
    ensure_tools(&definition, groups)?;

    let root = current_dir()?;
    let definition = Arc::new(definition);
    let executor = Arc::new(TaskExecutor::new(definition.clone(), root));
    let sequencer = Sequencer::new(&definition, executor)?;

    match sequencer.run(groups).await {
        Ok(report) => {
            println!();
            for outcome in &report.completed {
                let detail = if outcome.outputs.is_empty() {
                    format!("{} input(s)", outcome.inputs)
                } else {
                    format!("{} -> {} file(s)", outcome.inputs, outcome.outputs.len())
                };
                println!(
                    "  {} {} {} {}",
                    "✓".green(),
                    outcome.task,
                    detail.dimmed(),
                    format_duration(outcome.duration).dimmed()
                );
                if verbose {
                    for output in &outcome.outputs {
                        println!("      {} {}", "→".blue(), output.display());
                    }
                }
            }
            println!();
            println!(
                "{} {}",
                "Done".green().bold(),
                format!("in {}", format_duration(report.duration)).dimmed()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!();
            if let Some(task) = e.failed_task() {
                eprintln!("{}", format!("Task '{}' failed:", task).red().bold());
            }
            Err(e.into())
        }
    }
}

/// Print validation findings; fail on errors
pub(crate) fn ensure_valid(definition: &PipelineDefinition, verbose: bool) -> Result<()> {
    let validation = PipelineValidator::validate(definition);

    if !validation.is_valid() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    Ok(())
}

/// Fail before running anything when a command step's program is missing
pub(crate) fn ensure_tools(definition: &PipelineDefinition, groups: &[Group]) -> Result<()> {
    let dag = DagBuilder::build(definition)?;

    let mut names = BTreeSet::new();
    for group in groups {
        for name in group.names() {
            names.insert(name.to_string());
            names.extend(dag.ancestors(name).unwrap_or_default());
        }
    }

    let tasks = names.iter().filter_map(|n| definition.get_task(n));
    let missing = PipelineValidator::missing_tools(tasks);
    if missing.is_empty() {
        return Ok(());
    }

    eprintln!("{}", "Missing required tools:".red().bold());
    for tool in &missing {
        eprintln!("  {} {}", "✗".red(), tool);
    }
    Err(crate::errors::AssetflowError::tool_not_found(&missing[0]).into())
}
