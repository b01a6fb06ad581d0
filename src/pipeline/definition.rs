// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline definition structures
//!
//! Defines the schema for `.assetflow.yaml` files. When no file is present the
//! built-in [`PipelineDefinition::default`] asset pipeline is used.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::AssetflowError;

/// Default pipeline file name
pub const DEFAULT_CONFIG_FILE: &str = ".assetflow.yaml";

/// Complete pipeline definition: tasks plus the `build` and `develop` pipelines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Definition version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Project name
    #[serde(default = "default_name")]
    pub name: String,

    /// Project description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// All tasks, addressable by name
    pub tasks: Vec<TaskDefinition>,

    /// Deployment build sequence
    #[serde(default)]
    pub build: Vec<Group>,

    /// Development server and watch configuration
    #[serde(default)]
    pub develop: DevelopConfig,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_name() -> String {
    "assets".to_string()
}

impl PipelineDefinition {
    /// Load a definition from a YAML, JSON or TOML file (chosen by extension)
    pub fn from_file(path: &Path) -> Result<Self, AssetflowError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| AssetflowError::FileRead {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse a definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, AssetflowError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse a definition from a JSON string
    pub fn from_json(json: &str) -> Result<Self, AssetflowError> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Parse a definition from a TOML string
    pub fn from_toml(source: &str) -> Result<Self, AssetflowError> {
        toml::from_str(source).map_err(Into::into)
    }

    /// Serialize the definition to YAML
    pub fn to_yaml(&self) -> Result<String, AssetflowError> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a task by name
    pub fn get_task(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Get all task names in declaration order
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }

    /// Group that runs the develop pre-tasks concurrently
    pub fn develop_group(&self) -> Vec<Group> {
        if self.develop.tasks.is_empty() {
            Vec::new()
        } else {
            vec![Group::Parallel(self.develop.tasks.clone())]
        }
    }
}

/// A named unit of pipeline work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Task name (must be unique within the definition)
    pub name: String,

    /// Task description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// What the task does
    pub action: Action,

    /// Tasks that must complete successfully before this one starts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Browser reload to signal after a successful run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload: Option<ReloadScope>,
}

impl TaskDefinition {
    /// Short name of the task's action kind
    pub fn kind(&self) -> &'static str {
        match &self.action {
            Action::Transform { .. } => "transform",
            Action::Clean { .. } => "clean",
            Action::Inject { .. } => "inject",
        }
    }
}

/// Task action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Read files, run them through a chain of steps, write the results
    Transform {
        /// Input glob patterns
        input: PatternSet,

        /// Ordered transform steps
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        steps: Vec<Step>,

        /// Output directory; without one the task only resolves its inputs
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dest: Option<PathBuf>,
    },

    /// Remove a directory tree
    Clean {
        /// Directory to remove
        target: PathBuf,
    },

    /// Replace injection markers in an HTML template with asset references
    Inject {
        /// Template file
        template: PathBuf,

        /// Built assets to reference (discovered, not read)
        sources: PatternSet,

        /// Output directory for the rendered template
        dest: PathBuf,

        /// Prefix removed from every generated path (e.g. `/build/`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ignore_path: Option<String>,

        /// Keep a leading `/` on generated paths
        #[serde(default)]
        add_root_slash: bool,
    },
}

/// A single transform step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Step {
    /// Merge all files into one
    Concat {
        /// Output file name
        file: String,

        /// Text placed between merged files
        #[serde(default = "default_separator")]
        separator: String,
    },

    /// Pipe each file through an external command (stdin to stdout)
    Command {
        /// Command line to run
        command: String,

        /// Shell to use
        #[serde(default = "default_shell")]
        shell: String,

        /// New extension for the produced files
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extension: Option<String>,
    },

    /// Change the extension or the file name of every file
    Rename {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extension: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },

    /// Prepend a header line to every file
    Banner {
        /// Header text
        text: String,
    },
}

fn default_separator() -> String {
    "\n".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Step {
    /// Step name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Concat { .. } => "concat",
            Self::Command { .. } => "command",
            Self::Rename { .. } => "rename",
            Self::Banner { .. } => "banner",
        }
    }
}

/// Ordered glob patterns; `!`-prefixed entries exclude earlier matches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PatternSet {
    /// Single glob pattern
    Single(String),

    /// Multiple glob patterns
    Multiple(Vec<String>),
}

impl PatternSet {
    /// Get the patterns in declaration order
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Multiple(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }

    /// True when no non-blank pattern is present
    pub fn is_empty(&self) -> bool {
        self.patterns().iter().all(|p| p.trim().is_empty())
    }
}

impl From<&str> for PatternSet {
    fn from(pattern: &str) -> Self {
        Self::Single(pattern.to_string())
    }
}

impl From<Vec<&str>> for PatternSet {
    fn from(patterns: Vec<&str>) -> Self {
        Self::Multiple(patterns.into_iter().map(String::from).collect())
    }
}

/// Browser refresh requested after a task completes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReloadScope {
    /// Full page reload
    Full,
    /// Re-fetch stylesheets without navigating
    Css,
}

impl ReloadScope {
    /// Wire name sent to browser clients
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "reload",
            Self::Css => "css",
        }
    }
}

impl std::fmt::Display for ReloadScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Css => write!(f, "css"),
        }
    }
}

/// One step of a pipeline: a single task or tasks run concurrently
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Group {
    Single(String),
    Parallel(Vec<String>),
}

impl Group {
    /// Task names in this group
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Parallel(names) => names.iter().map(|s| s.as_str()).collect(),
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(name) => write!(f, "{}", name),
            Self::Parallel(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

/// Development mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevelopConfig {
    /// Tasks run (concurrently) before the server starts
    #[serde(default)]
    pub tasks: Vec<String>,

    /// Dev server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Watch bindings
    #[serde(default)]
    pub watch: Vec<WatchBinding>,

    /// Debounce window for file events, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for DevelopConfig {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            server: ServerConfig::default(),
            watch: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listening TCP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served as static content
    #[serde(default = "default_server_root")]
    pub root: PathBuf,

    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    7001
}

fn default_server_root() -> PathBuf {
    PathBuf::from("src")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            root: default_server_root(),
            host: default_host(),
        }
    }
}

/// Re-run `task` whenever a file matching `patterns` changes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchBinding {
    pub patterns: PatternSet,
    pub task: String,
}

impl Default for PipelineDefinition {
    /// The standard front-end layout: `src/` sources, `build/` output
    fn default() -> Self {
        let js = vec!["src/contents/js/lib/*.js", "src/contents/js/*.js"];

        let transform = |input: PatternSet, steps: Vec<Step>, dest: Option<&str>| {
            Action::Transform {
                input,
                steps,
                dest: dest.map(PathBuf::from),
            }
        };
        let command = |command: &str, extension: Option<&str>| Step::Command {
            command: command.to_string(),
            shell: default_shell(),
            extension: extension.map(String::from),
        };
        let task = |name: &str, description: &str, action: Action| TaskDefinition {
            name: name.to_string(),
            description: Some(description.to_string()),
            action,
            depends_on: Vec::new(),
            reload: None,
        };

        let tasks = vec![
            TaskDefinition {
                reload: Some(ReloadScope::Full),
                ..task(
                    "html",
                    "Reload browsers when HTML changes",
                    transform("src/*.html".into(), vec![], None),
                )
            },
            TaskDefinition {
                reload: Some(ReloadScope::Full),
                ..task(
                    "js",
                    "Reload browsers when scripts change",
                    transform(js.clone().into(), vec![], None),
                )
            },
            TaskDefinition {
                reload: Some(ReloadScope::Css),
                ..task(
                    "scss",
                    "Compile SCSS to CSS next to the sources",
                    transform(
                        // Partials are only compiled through their importers
                        vec![
                            "src/contents/css/scss/*.scss",
                            "!src/contents/css/scss/_*.scss",
                        ]
                        .into(),
                        vec![command(
                            "sass --stdin --load-path=src/contents/css/scss --style=expanded --embed-source-map",
                            Some("css"),
                        )],
                        Some("src/contents/css"),
                    ),
                )
            },
            task(
                "build-js",
                "Concatenate and minify scripts",
                transform(
                    js.clone().into(),
                    vec![
                        Step::Concat {
                            file: "all.js".to_string(),
                            separator: default_separator(),
                        },
                        command("terser --comments '/^!/'", None),
                    ],
                    Some("build/contents/js"),
                ),
            ),
            TaskDefinition {
                depends_on: vec!["scss".to_string()],
                ..task(
                    "build-css",
                    "Prefix, concatenate and minify stylesheets",
                    transform(
                        "src/contents/css/*.css".into(),
                        vec![
                            command("postcss --use autoprefixer", None),
                            Step::Concat {
                                file: "all.css".to_string(),
                                separator: default_separator(),
                            },
                            command("cleancss --format keep-breaks", None),
                        ],
                        Some("build/contents/css"),
                    ),
                )
            },
            task(
                "build-img",
                "Compress images",
                transform(
                    "src/contents/img/*".into(),
                    vec![command("imagemin", None)],
                    Some("build/contents/img"),
                ),
            ),
            task(
                "build-index",
                "Render index.html with references to built assets",
                Action::Inject {
                    template: PathBuf::from("src/index.html"),
                    sources: vec!["build/contents/js/*.js", "build/contents/css/*.css"].into(),
                    dest: PathBuf::from("build"),
                    ignore_path: Some("/build/".to_string()),
                    add_root_slash: false,
                },
            ),
            task(
                "build-clean",
                "Remove the previous build",
                Action::Clean {
                    target: PathBuf::from("build"),
                },
            ),
        ];

        let watch = |patterns: PatternSet, task: &str| WatchBinding {
            patterns,
            task: task.to_string(),
        };

        Self {
            version: default_version(),
            name: default_name(),
            description: Some("Front-end asset pipeline".to_string()),
            tasks,
            build: vec![
                Group::Single("build-clean".to_string()),
                Group::Parallel(vec![
                    "build-js".to_string(),
                    "build-css".to_string(),
                    "build-img".to_string(),
                ]),
                Group::Single("build-index".to_string()),
            ],
            develop: DevelopConfig {
                tasks: vec!["html".to_string(), "js".to_string(), "scss".to_string()],
                server: ServerConfig::default(),
                watch: vec![
                    watch("src/*.html".into(), "html"),
                    watch(js.into(), "js"),
                    watch("src/contents/css/scss/**/*.scss".into(), "scss"),
                ],
                debounce_ms: default_debounce_ms(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_definition() {
        let yaml = r#"
name: "site"
tasks:
  - name: "build-js"
    action:
      type: transform
      input:
        - "src/js/lib/*.js"
        - "src/js/*.js"
      steps:
        - type: concat
          file: all.js
      dest: build/js
build:
  - build-js
"#;

        let definition = PipelineDefinition::from_yaml(yaml).unwrap();
        assert_eq!(definition.name, "site");
        assert_eq!(definition.version, "1");
        assert_eq!(definition.tasks.len(), 1);
        assert_eq!(definition.build, vec![Group::Single("build-js".into())]);
        assert_eq!(definition.develop.server.port, 7001);

        match &definition.tasks[0].action {
            Action::Transform { input, steps, dest } => {
                assert_eq!(input.patterns(), vec!["src/js/lib/*.js", "src/js/*.js"]);
                assert_eq!(
                    steps[0],
                    Step::Concat {
                        file: "all.js".into(),
                        separator: "\n".into()
                    }
                );
                assert_eq!(dest.as_deref(), Some(Path::new("build/js")));
            }
            _ => panic!("Expected transform action"),
        }
    }

    #[test]
    fn test_parse_parallel_groups_and_watch() {
        let yaml = r#"
tasks:
  - name: clean
    action: { type: clean, target: build }
  - name: a
    action: { type: transform, input: "a/*" }
  - name: b
    action: { type: transform, input: "b/*" }
    reload: css
build:
  - clean
  - [a, b]
develop:
  server:
    port: 8080
  watch:
    - patterns: "b/**/*.scss"
      task: b
"#;

        let definition = PipelineDefinition::from_yaml(yaml).unwrap();
        assert_eq!(
            definition.build[1],
            Group::Parallel(vec!["a".into(), "b".into()])
        );
        assert_eq!(definition.develop.server.port, 8080);
        assert_eq!(definition.develop.server.root, PathBuf::from("src"));
        assert_eq!(definition.develop.watch[0].task, "b");
        assert_eq!(definition.get_task("b").unwrap().reload, Some(ReloadScope::Css));
        assert_eq!(definition.get_task("clean").unwrap().kind(), "clean");
    }

    #[test]
    fn test_parse_toml_definition() {
        let source = r#"
name = "site"
build = ["clean"]

[[tasks]]
name = "clean"
action = { type = "clean", target = "dist" }
"#;

        let definition = PipelineDefinition::from_toml(source).unwrap();
        assert_eq!(definition.task_names(), vec!["clean"]);
    }

    #[test]
    fn test_default_definition_round_trips_yaml() {
        let definition = PipelineDefinition::default();
        let yaml = definition.to_yaml().unwrap();
        let parsed = PipelineDefinition::from_yaml(&yaml).unwrap();

        assert_eq!(parsed.task_names(), definition.task_names());
        assert_eq!(parsed.build, definition.build);
        assert_eq!(parsed.develop.watch, definition.develop.watch);
        assert_eq!(
            parsed.get_task("build-css").unwrap().depends_on,
            vec!["scss".to_string()]
        );
    }

    #[test]
    fn test_develop_group() {
        let definition = PipelineDefinition::default();
        assert_eq!(
            definition.develop_group(),
            vec![Group::Parallel(vec![
                "html".into(),
                "js".into(),
                "scss".into()
            ])]
        );
    }
}
