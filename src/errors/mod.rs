// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Error types
//!
//! Every failure in assetflow is an [`AssetflowError`]. Variants carry enough
//! context (task, step, path) for `miette` to render a useful report.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for assetflow operations
pub type AssetflowResult<T> = Result<T, AssetflowError>;

/// Main error type for assetflow
#[derive(Error, Debug, Diagnostic)]
pub enum AssetflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Task Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Task '{task}': step '{step}' failed: {message}")]
    #[diagnostic(code(assetflow::transform_failed))]
    TransformFailed {
        task: String,
        step: String,
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Task '{task}' is not defined (referenced by {referenced_by})")]
    #[diagnostic(
        code(assetflow::task_not_found),
        help("Check that '{task}' is listed under `tasks` in your pipeline file")
    )]
    TaskNotFound { task: String, referenced_by: String },

    #[error("Task '{task}' failed: {source}")]
    #[diagnostic(code(assetflow::task_failed))]
    TaskFailed {
        task: String,
        #[source]
        source: Box<AssetflowError>,
    },

    #[error("Tool '{tool}' not found")]
    #[diagnostic(code(assetflow::tool_not_found), help("{suggestion}"))]
    ToolNotFound { tool: String, suggestion: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(assetflow::config_not_found),
        help("Create one with 'assetflow init' or omit --config to use the built-in pipeline")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid pipeline configuration: {reason}")]
    #[diagnostic(code(assetflow::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Task '{task}' is defined more than once")]
    #[diagnostic(code(assetflow::duplicate_task))]
    DuplicateTask { task: String },

    #[error("Circular dependency detected: {}", .tasks.join(" → "))]
    #[diagnostic(
        code(assetflow::circular_dependency),
        help("Review the `depends_on` lists of these tasks to remove the cycle")
    )]
    CircularDependency { tasks: Vec<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(assetflow::file_read_error))]
    FileRead { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(assetflow::file_write_error))]
    FileWrite { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Runtime Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("File watcher error: {message}")]
    #[diagnostic(code(assetflow::watch_error))]
    Watch { message: String },

    #[error("Dev server error: {message}")]
    #[diagnostic(code(assetflow::server_error))]
    Server {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Execution failed: {message}")]
    #[diagnostic(code(assetflow::execution_failed))]
    ExecutionFailed { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/Parsing Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(assetflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(assetflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(assetflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(assetflow::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(assetflow::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for AssetflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for AssetflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for AssetflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for AssetflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for AssetflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl AssetflowError {
    /// Create a tool not found error with an installation hint
    pub fn tool_not_found(tool: &str) -> Self {
        let suggestion = match tool {
            "sass" => "Install Dart Sass: npm install -g sass".to_string(),
            "terser" => "Install terser: npm install -g terser".to_string(),
            "cleancss" => "Install clean-css-cli: npm install -g clean-css-cli".to_string(),
            "postcss" => {
                "Install PostCSS: npm install -g postcss-cli autoprefixer".to_string()
            }
            "imagemin" => "Install imagemin-cli: npm install -g imagemin-cli".to_string(),
            _ => format!("Install {} and ensure it's in your PATH", tool),
        };

        Self::ToolNotFound {
            tool: tool.to_string(),
            suggestion,
        }
    }

    /// Tag an error with the task that produced it
    pub fn in_task(self, task: &str) -> Self {
        match self {
            // Already tagged by a nested run
            Self::TaskFailed { .. } => self,
            other => Self::TaskFailed {
                task: task.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Name of the failing task, if this error was tagged with one
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            Self::TaskFailed { task, .. } => Some(task),
            Self::TransformFailed { task, .. } => Some(task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_task_wraps_once() {
        let err = AssetflowError::Io {
            message: "disk full".into(),
        }
        .in_task("build-js")
        .in_task("outer");

        assert_eq!(err.failed_task(), Some("build-js"));
        assert!(err.to_string().contains("disk full"));
        match err {
            AssetflowError::TaskFailed { source, .. } => {
                assert!(matches!(*source, AssetflowError::Io { .. }))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tool_not_found_suggestion() {
        match AssetflowError::tool_not_found("sass") {
            AssetflowError::ToolNotFound { suggestion, .. } => {
                assert!(suggestion.contains("npm install -g sass"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
