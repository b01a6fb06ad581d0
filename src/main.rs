// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! assetflow - front-end asset pipeline
//!
//! Compile, bundle and minify web assets; serve them with live reload.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assetflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assetflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let config = cli.config;

    // Dispatch to command handlers; no subcommand means develop
    match cli.command.unwrap_or(Commands::Develop { port: None }) {
        Commands::Develop { port } => assetflow::cli::develop::run(config, port, cli.verbose).await,
        Commands::Build => assetflow::cli::build::run(config, cli.verbose).await,
        Commands::Run { tasks } => assetflow::cli::run::run(config, tasks, cli.verbose).await,
        Commands::Validate => assetflow::cli::validate::run(config, cli.verbose).await,
        Commands::Graph { format } => assetflow::cli::graph::run(config, format, cli.verbose).await,
        Commands::List => assetflow::cli::list::run(config, cli.verbose).await,
        Commands::Init { force } => assetflow::cli::init::run(&config, force, cli.verbose).await,
    }
}
