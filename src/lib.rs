// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! # assetflow - front-end asset pipeline
//!
//! `assetflow` compiles, bundles and minifies web assets, serves the source
//! tree with live reload during development, and produces an optimized
//! `build/` directory for deployment.
//!
//! ## Features
//!
//! - **Declarative tasks** - transform, clean and inject tasks in `.assetflow.yaml`
//! - **Pipelines** - ordered groups of concurrently running tasks
//! - **Watch mode** - debounced file watching re-runs the bound task
//! - **Live reload** - full page or stylesheet-only refresh over a WebSocket
//!
//! ## Quick Start
//!
//! ```bash
//! # Write the default pipeline and source layout
//! assetflow init
//!
//! # Serve src/ with live reload
//! assetflow
//!
//! # Build for deployment
//! assetflow build
//! ```

pub mod cli;
pub mod errors;
pub mod pipeline;
pub mod server;
pub mod tasks;
pub mod transform;
pub mod watch;

// Re-export commonly used types
pub use errors::{AssetflowError, AssetflowResult};
pub use pipeline::{Group, PipelineDefinition, Sequencer};
pub use tasks::{TaskExecutor, TaskOutcome, TaskRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
