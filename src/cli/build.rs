// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Build command - run the build pipeline

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::load_definition;

/// Run the build pipeline
pub async fn run(config: PathBuf, verbose: bool) -> Result<()> {
    let definition = load_definition(&config)?;

    if definition.build.is_empty() {
        println!("{}", "Build pipeline is empty, nothing to do.".yellow());
        return Ok(());
    }

    println!("{} {}", "Building".bold(), definition.name);
    if verbose {
        let order: Vec<String> = definition.build.iter().map(|g| g.to_string()).collect();
        println!("  {} {}", "→".blue(), order.join(" → ").dimmed());
    }

    let groups = definition.build.clone();
    super::run::execute(definition, &groups, verbose).await
}
