// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! List command - show tasks and pipelines

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::load_definition;

/// Print every task, the build sequence and the develop configuration
pub async fn run(config: PathBuf, verbose: bool) -> Result<()> {
    let definition = load_definition(&config)?;

    println!("{}:", "Tasks".bold());
    let width = definition
        .tasks
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(0);
    for task in &definition.tasks {
        let description = task.description.as_deref().unwrap_or("");
        println!(
            "  {:width$}  {:9}  {}",
            task.name.cyan(),
            task.kind(),
            description.dimmed(),
            width = width
        );
        if verbose && !task.depends_on.is_empty() {
            println!("  {:width$}  depends on {}", "", task.depends_on.join(", "), width = width);
        }
    }

    println!();
    println!("{}:", "build".bold());
    if definition.build.is_empty() {
        println!("  {}", "(empty)".dimmed());
    }
    for (i, group) in definition.build.iter().enumerate() {
        println!("  {}. {}", i + 1, group);
    }

    println!();
    println!("{}:", "develop".bold());
    if !definition.develop.tasks.is_empty() {
        println!("  tasks: {}", definition.develop.tasks.join(", "));
    }
    let server = &definition.develop.server;
    println!(
        "  serve: {} on {}:{}",
        server.root.display(),
        server.host,
        server.port
    );
    for binding in &definition.develop.watch {
        println!(
            "  watch: {} {} {}",
            binding.patterns.patterns().join(", "),
            "→".blue(),
            binding.task
        );
    }

    Ok(())
}
