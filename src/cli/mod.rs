// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for assetflow.

pub mod build;
pub mod develop;
pub mod graph;
pub mod init;
pub mod list;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::{PipelineDefinition, DEFAULT_CONFIG_FILE};

/// Front-end asset pipeline
///
/// Compile, bundle and minify web assets; serve them with live reload.
#[derive(Parser, Debug)]
#[clap(
    name = "assetflow",
    version,
    about = "Front-end asset pipeline: watch, build, live reload",
    long_about = None,
    after_help = "Examples:\n\
        assetflow                       Start the dev server and watch sources\n\
        assetflow build                 Produce the optimized build/ directory\n\
        assetflow run scss              Run a single task\n\
        assetflow init                  Write the default pipeline file\n\n\
        See 'assetflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Pipeline file
    #[clap(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run develop tasks, serve the source tree and rebuild on change
    #[clap(alias = "default")]
    Develop {
        /// Override the dev server port
        #[clap(short, long)]
        port: Option<u16>,
    },

    /// Run the build pipeline
    #[clap(alias = "deploy")]
    Build,

    /// Run named tasks (and their dependencies) concurrently
    Run {
        /// Tasks to run
        #[clap(required = true)]
        tasks: Vec<String>,
    },

    /// Validate pipeline configuration
    Validate,

    /// Show task dependencies as a graph
    Graph {
        /// Output format
        #[clap(short, long, value_enum, default_value = "text")]
        format: GraphFormat,
    },

    /// List tasks and pipelines
    List,

    /// Write the default pipeline file and source layout
    Init {
        /// Overwrite an existing pipeline file
        #[clap(short, long)]
        force: bool,
    },
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// Load the pipeline file, falling back to the built-in pipeline when the
/// default file is absent
pub fn load_definition(path: &Path) -> miette::Result<PipelineDefinition> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "loading pipeline file");
        return Ok(PipelineDefinition::from_file(path)?);
    }

    if path == Path::new(DEFAULT_CONFIG_FILE) {
        tracing::debug!("no {} found, using built-in pipeline", DEFAULT_CONFIG_FILE);
        return Ok(PipelineDefinition::default());
    }

    Err(crate::errors::AssetflowError::ConfigNotFound {
        path: path.to_path_buf(),
    }
    .into())
}

/// Current working directory as a miette error
pub(crate) fn current_dir() -> miette::Result<PathBuf> {
    std::env::current_dir().map_err(|e| miette::miette!("Failed to get current directory: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["assetflow"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_aliases() {
        let cli = Cli::try_parse_from(["assetflow", "deploy"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Build)));

        let cli = Cli::try_parse_from(["assetflow", "default", "--port", "9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Develop { port: Some(9000) })
        ));
    }

    #[test]
    fn test_run_requires_tasks() {
        assert!(Cli::try_parse_from(["assetflow", "run"]).is_err());
        let cli = Cli::try_parse_from(["assetflow", "run", "scss", "js", "-c", "p.yaml"]).unwrap();
        match cli.command {
            Some(Commands::Run { tasks }) => assert_eq!(tasks, vec!["scss", "js"]),
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from("p.yaml"));
    }

    #[test]
    fn test_graph_format_values() {
        let cli = Cli::try_parse_from(["assetflow", "graph"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Graph {
                format: GraphFormat::Text
            })
        ));

        let cli = Cli::try_parse_from(["assetflow", "graph", "--format", "mermaid"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Graph {
                format: GraphFormat::Mermaid
            })
        ));

        assert!(Cli::try_parse_from(["assetflow", "graph", "-f", "svg"]).is_err());
    }

    #[test]
    fn test_load_definition_fallback() {
        let def = load_definition(Path::new(DEFAULT_CONFIG_FILE));
        // Running from the crate root, no pipeline file exists there
        if !Path::new(DEFAULT_CONFIG_FILE).exists() {
            assert_eq!(def.unwrap().name, PipelineDefinition::default().name);
        }

        assert!(load_definition(Path::new("missing/pipeline.yaml")).is_err());
    }
}
