// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Graph command - visualize task dependencies

use miette::Result;
use std::path::PathBuf;

use super::{load_definition, GraphFormat};
use crate::pipeline::DagBuilder;

/// Run the graph command
pub async fn run(config: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    let definition = load_definition(&config)?;
    let dag = DagBuilder::build(&definition)?;

    let output = match format {
        GraphFormat::Text => dag.to_text(&definition)?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
