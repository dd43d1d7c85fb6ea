//! Pipeline module.
//!
//! This module provides the main preparation pipeline and related components.

mod builder;
mod executor;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder, PipelineOutput};
pub use executor::{StageExecutor, TaskSplit};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
