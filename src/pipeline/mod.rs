// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! Pipeline definitions and orchestration
//!
//! This module defines the pipeline data model (tasks, groups, watch
//! bindings), validates it, and sequences task execution.

mod dag;
mod definition;
mod sequencer;
mod validation;

pub use dag::DagBuilder;
pub use definition::*;
pub use sequencer::{format_duration, SequenceReport, Sequencer};
pub use validation::{command_program, PipelineValidator, ValidationResult};
