// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::current_dir;
use crate::pipeline::{PipelineDefinition, PipelineValidator, DEFAULT_CONFIG_FILE};

/// Run the validate command
pub async fn run(config: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let definition = if config.exists() {
        match PipelineDefinition::from_file(&config) {
            Ok(d) => {
                println!("  {} {} parsed", "✓".green(), config.display());
                d
            }
            Err(e) => {
                eprintln!("  {} Failed to parse {}", "✗".red(), config.display());
                eprintln!();
                return Err(e.into());
            }
        }
    } else if config == std::path::Path::new(DEFAULT_CONFIG_FILE) {
        println!("  {} Using built-in pipeline", "→".blue());
        PipelineDefinition::default()
    } else {
        return Err(crate::errors::AssetflowError::ConfigNotFound { path: config }.into());
    };

    let validation = PipelineValidator::validate(&definition);

    let cwd = current_dir()?;
    let missing_files = PipelineValidator::validate_files(&definition, &cwd);
    let missing_tools = PipelineValidator::missing_tools(&definition.tasks);

    let mut has_issues = false;

    if !validation.errors.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !missing_files.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Missing files".yellow().bold());
        for missing in &missing_files {
            println!("  {} {}", "⚠".yellow(), missing);
        }
    }

    // Tools only matter when the task runs, so these stay warnings
    if !missing_tools.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Tools not on PATH".yellow().bold());
        for tool in &missing_tools {
            println!("  {} {}", "⚠".yellow(), tool);
        }
    }

    if !validation.warnings.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        println!("  Name: {}", definition.name);
        println!("  Tasks: {}", definition.tasks.len());
        for task in &definition.tasks {
            let deps = if task.depends_on.is_empty() {
                String::new()
            } else {
                format!(" [depends: {}]", task.depends_on.join(", "))
            };
            println!("    - {} ({}){}", task.name, task.kind(), deps.dimmed());
        }
    }

    println!();

    if !validation.is_valid() || !missing_files.is_empty() {
        return Err(miette::miette!("Pipeline validation failed"));
    }

    if has_issues {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
    }
    Ok(())
}
