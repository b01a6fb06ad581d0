// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! DAG (Directed Acyclic Graph) builder for task dependencies
//!
//! Builds and validates the `depends_on` graph of a pipeline definition,
//! rejecting unknown task names and cycles before anything runs.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use petgraph::Direction;
use std::collections::HashMap;

use crate::errors::AssetflowError;
use crate::pipeline::PipelineDefinition;

/// Builder for task dependency DAGs
#[derive(Debug, Clone)]
pub struct DagBuilder {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
}

impl DagBuilder {
    /// Create an empty DAG builder
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            index_to_name: HashMap::new(),
        }
    }

    /// Build a DAG from a pipeline definition
    pub fn build(definition: &PipelineDefinition) -> Result<Self, AssetflowError> {
        let mut builder = Self::new();

        for (idx, task) in definition.tasks.iter().enumerate() {
            if builder.name_to_index.contains_key(&task.name) {
                return Err(AssetflowError::DuplicateTask {
                    task: task.name.clone(),
                });
            }
            let node = builder.graph.add_node(idx);
            builder.name_to_index.insert(task.name.clone(), node);
            builder.index_to_name.insert(node, task.name.clone());
        }

        for task in &definition.tasks {
            let task_node = builder.name_to_index[&task.name];

            for dep_name in &task.depends_on {
                let dep_node = builder.name_to_index.get(dep_name).ok_or_else(|| {
                    AssetflowError::TaskNotFound {
                        task: dep_name.clone(),
                        referenced_by: format!("task '{}'", task.name),
                    }
                })?;

                if !builder.graph.contains_edge(*dep_node, task_node) {
                    builder.graph.add_edge(*dep_node, task_node, ());
                }
            }
        }

        builder.validate_acyclic()?;

        Ok(builder)
    }

    fn validate_acyclic(&self) -> Result<(), AssetflowError> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(_) => Err(AssetflowError::CircularDependency {
                tasks: self.cycle_members(),
            }),
        }
    }

    /// Names of the tasks taking part in the first cycle found
    fn cycle_members(&self) -> Vec<String> {
        tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| {
                component.len() > 1
                    || self.graph.contains_edge(component[0], component[0])
            })
            .map(|component| {
                let mut names: Vec<String> = component
                    .into_iter()
                    .map(|n| self.index_to_name[&n].clone())
                    .collect();
                names.sort();
                names
            })
            .unwrap_or_default()
    }

    /// Whether a task with this name exists
    pub fn contains(&self, task: &str) -> bool {
        self.name_to_index.contains_key(task)
    }

    /// Get topologically sorted task indices (into `definition.tasks`)
    pub fn topological_order(&self) -> Result<Vec<usize>, AssetflowError> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n]).collect())
            .map_err(|_| AssetflowError::CircularDependency {
                tasks: self.cycle_members(),
            })
    }

    /// Direct dependencies of a task (tasks that must run before it)
    pub fn dependencies(&self, task: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(task)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, Direction::Incoming)
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        deps.sort();
        Some(deps)
    }

    /// All transitive dependencies of a task, excluding the task itself
    pub fn ancestors(&self, task: &str) -> Option<Vec<String>> {
        let start = *self.name_to_index.get(task)?;
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut found = Vec::new();

        while let Some(node) = dfs.next(reversed) {
            if node != start {
                found.push(self.index_to_name[&node].clone());
            }
        }

        found.sort();
        Some(found)
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for name in self.sorted_names() {
            out.push_str(&format!("    {}[{}]\n", mermaid_id(name), name));
        }

        for (from, to) in self.sorted_edges() {
            out.push_str(&format!("    {} --> {}\n", mermaid_id(from), mermaid_id(to)));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to) in self.sorted_edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        // Isolated nodes do not appear in any edge
        for name in self.sorted_names() {
            let node = self.name_to_index[name];
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of a valid execution order
    pub fn to_text(&self, definition: &PipelineDefinition) -> Result<String, AssetflowError> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, idx) in order.iter().enumerate() {
            let task = &definition.tasks[*idx];
            let deps = self.dependencies(&task.name).unwrap_or_default();

            out.push_str(&format!("{}. {} ({})", i + 1, task.name, task.kind()));

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }

    fn sorted_names(&self) -> Vec<&String> {
        let mut names: Vec<&String> = self.name_to_index.keys().collect();
        names.sort();
        names
    }

    fn sorted_edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(from, to)| {
                (
                    self.index_to_name[&from].as_str(),
                    self.index_to_name[&to].as_str(),
                )
            })
            .collect();
        edges.sort();
        edges
    }
}

impl Default for DagBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Mermaid node ids cannot contain `-`
fn mermaid_id(name: &str) -> String {
    name.replace(['-', '.', ' '], "_")
}
