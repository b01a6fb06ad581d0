// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline validation
//!
//! Validates a pipeline definition before anything runs.

use std::collections::{BTreeSet, HashSet};
use std::path::{Component, Path};

use crate::errors::AssetflowError;
use crate::pipeline::{Action, DagBuilder, Group, PipelineDefinition, Step, TaskDefinition};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline definition
    pub fn validate(definition: &PipelineDefinition) -> ValidationResult {
        let mut result = ValidationResult::new();

        if definition.tasks.is_empty() {
            result.add_error("Pipeline has no tasks defined");
        }

        let mut seen_names = HashSet::new();
        for task in &definition.tasks {
            if !seen_names.insert(&task.name) {
                result.add_error(&format!("Duplicate task name: '{}'", task.name));
            }
        }

        match DagBuilder::build(definition) {
            Ok(_) => {}
            // Already reported above
            Err(AssetflowError::DuplicateTask { .. }) => {}
            Err(AssetflowError::CircularDependency { tasks }) => {
                result.add_error(&format!("Circular dependency: {}", tasks.join(" → ")));
            }
            Err(AssetflowError::TaskNotFound {
                task,
                referenced_by,
            }) => {
                result.add_error(&format!(
                    "Unknown task '{}' referenced by {}",
                    task, referenced_by
                ));
            }
            Err(e) => {
                result.add_error(&format!("DAG validation error: {}", e));
            }
        }

        Self::validate_groups("build", &definition.build, &seen_names, &mut result);
        Self::validate_groups(
            "develop",
            &definition.develop_group(),
            &seen_names,
            &mut result,
        );

        for binding in &definition.develop.watch {
            if !seen_names.contains(&binding.task) {
                result.add_error(&format!(
                    "Watch binding refers to unknown task '{}'",
                    binding.task
                ));
            }
            if binding.patterns.is_empty() {
                result.add_error(&format!(
                    "Watch binding for '{}' has no patterns",
                    binding.task
                ));
            }
        }

        if definition.build.is_empty() {
            result.add_warning("No `build` sequence defined; 'assetflow build' will do nothing");
        }

        for task in &definition.tasks {
            Self::validate_task(task, &mut result);
        }

        result
    }

    fn validate_groups(
        pipeline: &str,
        groups: &[Group],
        known: &HashSet<&String>,
        result: &mut ValidationResult,
    ) {
        for group in groups {
            let names = group.names();
            if names.is_empty() {
                result.add_warning(&format!("Pipeline '{}' contains an empty group", pipeline));
            }
            for name in names {
                if !known.iter().any(|k| k.as_str() == name) {
                    result.add_error(&format!(
                        "Pipeline '{}' refers to unknown task '{}'",
                        pipeline, name
                    ));
                }
            }
        }
    }

    /// Validate a single task
    fn validate_task(task: &TaskDefinition, result: &mut ValidationResult) {
        match &task.action {
            Action::Transform { input, steps, dest } => {
                if input.is_empty() {
                    result.add_error(&format!("Task '{}': Input pattern is empty", task.name));
                }
                for step in steps {
                    Self::validate_step(task, step, result);
                }
                if dest.is_none() && !steps.is_empty() {
                    result.add_warning(&format!(
                        "Task '{}': Steps run but no `dest` is set, results are discarded",
                        task.name
                    ));
                }
            }
            Action::Clean { target } => {
                if is_unsafe_clean_target(target) {
                    result.add_error(&format!(
                        "Task '{}': Refusing to clean '{}'",
                        task.name,
                        target.display()
                    ));
                }
            }
            Action::Inject {
                sources,
                ignore_path,
                ..
            } => {
                if sources.is_empty() {
                    result.add_warning(&format!(
                        "Task '{}': No sources to inject, markers will be emptied",
                        task.name
                    ));
                }
                if let Some(prefix) = ignore_path {
                    if prefix.trim().is_empty() {
                        result.add_warning(&format!(
                            "Task '{}': `ignore_path` is blank",
                            task.name
                        ));
                    }
                }
            }
        }
    }

    fn validate_step(task: &TaskDefinition, step: &Step, result: &mut ValidationResult) {
        match step {
            Step::Concat { file, .. } if file.trim().is_empty() => {
                result.add_error(&format!(
                    "Task '{}': concat step needs a file name",
                    task.name
                ));
            }
            Step::Command { command, .. } if command.trim().is_empty() => {
                result.add_error(&format!("Task '{}': Command is empty", task.name));
            }
            Step::Rename {
                extension: None,
                file: None,
            } => {
                result.add_warning(&format!(
                    "Task '{}': rename step changes nothing",
                    task.name
                ));
            }
            _ => {}
        }
    }

    /// Check that files the definition reads directly exist (runtime validation)
    pub fn validate_files(definition: &PipelineDefinition, base_path: &Path) -> Vec<String> {
        let mut missing = Vec::new();

        for task in &definition.tasks {
            if let Action::Inject { template, .. } = &task.action {
                if !base_path.join(template).is_file() {
                    missing.push(format!(
                        "Task '{}': Template not found: {}",
                        task.name,
                        template.display()
                    ));
                }
            }
        }

        let server_root = &definition.develop.server.root;
        if !base_path.join(server_root).is_dir() {
            missing.push(format!(
                "Dev server root not found: {}",
                server_root.display()
            ));
        }

        missing
    }

    /// External programs used by command steps of the given tasks that are not on PATH
    pub fn missing_tools<'a>(tasks: impl IntoIterator<Item = &'a TaskDefinition>) -> Vec<String> {
        let mut programs = BTreeSet::new();

        for task in tasks {
            if let Action::Transform { steps, .. } = &task.action {
                for step in steps {
                    if let Step::Command { command, .. } = step {
                        if let Some(program) = command_program(command) {
                            programs.insert(program.to_string());
                        }
                    }
                }
            }
        }

        programs
            .into_iter()
            .filter(|program| which::which(program).is_err())
            .collect()
    }
}

/// Program a command line runs
///
/// Leading `NAME=value` environment assignments are skipped.
pub fn command_program(command: &str) -> Option<&str> {
    command
        .split_whitespace()
        .find(|word| !is_env_assignment(word))
}

fn is_env_assignment(word: &str) -> bool {
    match word.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && !name.starts_with(|c: char| c.is_ascii_digit())
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

fn is_unsafe_clean_target(target: &Path) -> bool {
    let mut components = target.components().filter(|c| !matches!(c, Component::CurDir));
    match components.next() {
        None => true,
        Some(Component::RootDir) | Some(Component::Prefix(_)) => components.next().is_none(),
        Some(Component::ParentDir) => true,
        Some(_) => false,
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::WatchBinding;
    use std::path::PathBuf;

    fn transform(name: &str, deps: Vec<&str>) -> TaskDefinition {
        TaskDefinition {
            name: name.into(),
            description: None,
            action: Action::Transform {
                input: "src/*.js".into(),
                steps: vec![],
                dest: None,
            },
            depends_on: deps.into_iter().map(String::from).collect(),
            reload: None,
        }
    }

    fn definition(tasks: Vec<TaskDefinition>) -> PipelineDefinition {
        PipelineDefinition {
            tasks,
            build: vec![],
            develop: Default::default(),
            ..PipelineDefinition::default()
        }
    }

    #[test]
    fn test_default_definition_is_valid() {
        let result = PipelineValidator::validate(&PipelineDefinition::default());
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn test_validate_empty_definition() {
        let result = PipelineValidator::validate(&definition(vec![]));
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("no tasks"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let result =
            PipelineValidator::validate(&definition(vec![transform("dup", vec![]), transform("dup", vec![])]));
        assert!(!result.is_valid());
        assert_eq!(
            result.errors.iter().filter(|e| e.contains("Duplicate")).count(),
            1
        );
    }

    #[test]
    fn test_validate_unknown_references() {
        let mut def = definition(vec![transform("a", vec!["ghost"])]);
        def.build = vec![Group::Parallel(vec!["a".into(), "missing".into()])];
        def.develop.watch = vec![WatchBinding {
            patterns: "src/*.js".into(),
            task: "nope".into(),
        }];

        let result = PipelineValidator::validate(&def);
        assert!(result.errors.iter().any(|e| e.contains("'ghost'")));
        assert!(result.errors.iter().any(|e| e.contains("'missing'")));
        assert!(result.errors.iter().any(|e| e.contains("'nope'")));
    }

    #[test]
    fn test_validate_cycle() {
        let def = definition(vec![transform("a", vec!["b"]), transform("b", vec!["a"])]);
        let result = PipelineValidator::validate(&def);
        assert!(result.errors.iter().any(|e| e.contains("Circular")));
    }

    #[test]
    fn test_refuses_to_clean_project_root() {
        for target in [".", "/", "..", "../elsewhere", ""] {
            let def = definition(vec![TaskDefinition {
                action: Action::Clean {
                    target: PathBuf::from(target),
                },
                ..transform("clean", vec![])
            }]);
            let result = PipelineValidator::validate(&def);
            assert!(!result.is_valid(), "target {target:?} should be rejected");
        }

        assert!(!is_unsafe_clean_target(Path::new("./build")));
        assert!(!is_unsafe_clean_target(Path::new("/tmp/build")));
    }

    #[test]
    fn test_missing_tools() {
        let task = TaskDefinition {
            action: Action::Transform {
                input: "*.css".into(),
                steps: vec![Step::Command {
                    command: "definitely-not-a-real-tool-4711 --flag".into(),
                    shell: "sh".into(),
                    extension: None,
                }],
                dest: Some("out".into()),
            },
            ..transform("css", vec![])
        };

        assert_eq!(
            PipelineValidator::missing_tools([&task]),
            vec!["definitely-not-a-real-tool-4711".to_string()]
        );
    }

    #[test]
    fn test_command_program_skips_env_assignments() {
        assert_eq!(
            command_program("NODE_ENV=production terser --compress"),
            Some("terser")
        );
        assert_eq!(command_program("A=1 B_2=x sass --stdin"), Some("sass"));
        assert_eq!(command_program("cleancss --format=keep-breaks"), Some("cleancss"));
        assert_eq!(command_program("   "), None);
    }

    #[test]
    fn test_validate_files_reports_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let missing = PipelineValidator::validate_files(&PipelineDefinition::default(), dir.path());
        assert!(missing.iter().any(|m| m.contains("index.html")));
        assert!(missing.iter().any(|m| m.contains("server root")));
    }
}
