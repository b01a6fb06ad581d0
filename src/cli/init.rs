// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Init command - write the default pipeline and source layout

use colored::Colorize;
use miette::Result;
use std::path::Path;

use crate::pipeline::PipelineDefinition;

const HEADER: &str = "# assetflow pipeline configuration\n\
# Tasks run shell commands (sass, postcss, terser, cleancss, imagemin);\n\
# install them with npm or replace the steps with your own tools.\n\n";

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{name}</title>
  <!-- inject:css -->
  <link rel="stylesheet" href="contents/css/main.css">
  <!-- endinject -->
</head>
<body>
  <h1>{name}</h1>

  <!-- inject:js -->
  <script src="contents/js/main.js"></script>
  <!-- endinject -->
</body>
</html>
"#;

/// Run the init command
pub async fn run(config: &Path, force: bool, verbose: bool) -> Result<()> {
    println!("{}", "Initializing assetflow project...".bold());
    println!();

    if config.exists() && !force {
        return Err(miette::miette!(
            help = "Use --force to overwrite it",
            "{} already exists",
            config.display()
        ));
    }

    let project_name = std::env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
        .unwrap_or_else(|| "assets".to_string());

    let definition = PipelineDefinition {
        name: project_name.clone(),
        ..PipelineDefinition::default()
    };
    let content = format!("{}{}", HEADER, definition.to_yaml()?);

    std::fs::write(config, &content)
        .map_err(|e| miette::miette!("Failed to write {}: {}", config.display(), e))?;
    println!("  {} Created {}", "✓".green(), config.display());

    let dirs = [
        "src/contents/js/lib",
        "src/contents/css/scss",
        "src/contents/img",
    ];
    for dir in dirs {
        if !Path::new(dir).exists() {
            std::fs::create_dir_all(dir)
                .map_err(|e| miette::miette!("Failed to create directory '{}': {}", dir, e))?;
            println!("  {} Created {}/", "✓".green(), dir);
        }
    }

    let index = Path::new("src/index.html");
    if !index.exists() {
        std::fs::write(index, INDEX_HTML.replace("{name}", &project_name))
            .map_err(|e| miette::miette!("Failed to write {}: {}", index.display(), e))?;
        println!("  {} Created {}", "✓".green(), index.display());
    }

    println!();
    println!("{}", "Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Put sources under {}", "src/contents/".cyan());
    println!("  2. Run {} to develop with live reload", "assetflow".cyan());
    println!("  3. Run {} to produce build/", "assetflow build".cyan());
    println!();

    if verbose {
        println!("{}", "Generated pipeline:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_yaml_comment() {
        let definition = PipelineDefinition {
            name: "site".to_string(),
            ..PipelineDefinition::default()
        };
        let content = format!("{}{}", HEADER, definition.to_yaml().unwrap());
        assert_eq!(PipelineDefinition::from_yaml(&content).unwrap().name, "site");
    }

    #[test]
    fn test_index_template_has_markers() {
        let rendered = crate::tasks::inject::render(&INDEX_HTML, &[]);
        assert!(rendered.contains("<!-- inject:css -->"));
        assert!(rendered.contains("<!-- inject:js -->"));
        assert!(!rendered.contains("main.css"));
    }
}
