//! Flight Data Preparation Library
//!
//! A deterministic cleaning, feature and split pipeline for the NYC flights
//! tables (`airlines`, `airports`, `flights`, `planes`, `weather`), built with
//! Rust and Polars.
//!
//! # Overview
//!
//! - **Loading**: semicolon-separated files read as text, then parsed into
//!   declared column types (decimal commas accepted)
//! - **Cleaning**: per-table drop criteria and imputation rules, with
//!   missingness checked before and after
//! - **Features**: hourly weather lookup, time-of-day buckets, carrier
//!   grouping, a late-arrival indicator and min-max scaling
//! - **Splitting**: seeded, stratified train/test partitions for a regression
//!   and a classification task
//! - **Export**: CSV or Parquet splits plus a JSON run report
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use flight_prep::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .data_dir("data")
//!     .output_dir("output")
//!     .seed(11111)
//!     .build()?;
//!
//! let output = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! for task in &output.splits {
//!     println!(
//!         "{}: {} train / {} test",
//!         task.task.name,
//!         task.split.train.height(),
//!         task.split.test.height()
//!     );
//! }
//! ```
//!
//! # Cleaning Rules
//!
//! Every table is cleaned by the same [`Cleaner`]; only the
//! [`CleaningRule`] differs. Rules are plain data and can be replaced from
//! the JSON configuration:
//!
//! ```rust,ignore
//! use flight_prep::cleaner::{CleaningRule, DropCriterion, ImputeStrategy};
//!
//! let rule = CleaningRule::new("planes")
//!     .drop_when(DropCriterion::any_missing(["tailnum"]))
//!     .impute("seats", ImputeStrategy::Median)
//!     .impute("manufacturer", ImputeStrategy::Mode);
//! ```

pub mod cleaner;
pub mod config;
pub mod datasets;
pub mod error;
pub mod features;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod split;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CleanedTable, Cleaner, CleaningRule, DropCriterion, ImputeStrategy};
pub use config::{
    ConfigValidationError, ExportFormat, PipelineConfig, PipelineConfigBuilder, RuleOverrides,
};
pub use error::{PipelineError, Result as PipelineResult, ResultExt};
pub use features::{
    FeatureBuilder, FeaturePlan, FeatureSpec, FeatureTable, FeatureTransform, TimeOfDay,
};
pub use imputers::StatisticalImputer;
pub use loader::{Loader, RawTables};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineOutput, PipelineStage,
    ProgressReporter, ProgressUpdate, TaskSplit,
};
pub use quality::MissingnessAnalyzer;
pub use reporting::{Exporter, InspectionReport, PipelineReport};
pub use split::{Split, SplitSpec, Splitter, Stratification};
pub use types::{
    CleaningOutcome, MissingnessReport, NormalizationParams, PipelineWarning, SemanticType,
    TableKind, TableSchema,
};
