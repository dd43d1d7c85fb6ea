//! Main pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating load, clean, feature, split and export.

use crate::cleaner::CleanedTable;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::features::FeatureTable;
use crate::loader::{Loader, RawTables};
use crate::pipeline::executor::{StageExecutor, TaskSplit};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::quality::MissingnessAnalyzer;
use crate::reporting::{
    Exporter, InspectionReport, PipelineReport, RunSettings, SplitSummary, TableOverview, timestamp,
};
use crate::types::{NormalizedColumn, TableKind};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub cleaned: BTreeMap<TableKind, CleanedTable>,
    pub features: FeatureTable,
    pub splits: Vec<TaskSplit>,
    pub report: PipelineReport,
}

impl PipelineOutput {
    pub fn cleaned_frame(&self, kind: TableKind) -> Option<&DataFrame> {
        self.cleaned.get(&kind).map(|c| &c.frame)
    }

    pub fn split(&self, task: &str) -> Option<&TaskSplit> {
        self.splits.iter().find(|s| s.task.name == task)
    }

    pub fn normalization(&self) -> &[NormalizedColumn] {
        &self.features.normalization
    }
}

/// The flight preparation pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use flight_prep::{Pipeline, PipelineConfig};
///
/// let output = Pipeline::builder()
///     .config(PipelineConfig::builder().data_dir("data").build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
///
/// let classification = output.split("classification").unwrap();
/// println!("{} training rows", classification.split.train.height());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure Pipeline is Send (can be moved to another thread)
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the five tables from the data directory and run every stage.
    pub fn run(&self) -> Result<PipelineOutput> {
        let result = self.load().and_then(|raw| self.process(&raw));
        self.finish(result)
    }

    /// Run every stage on tables that are already in memory.
    ///
    /// Text columns are parsed the same way the loader parses them.
    pub fn run_with_tables(&self, raw: RawTables) -> Result<PipelineOutput> {
        let result = self.process(&raw);
        self.finish(result)
    }

    /// Load the tables and report their missingness without cleaning.
    pub fn inspect(&self) -> Result<InspectionReport> {
        let raw = self.load()?;
        let tables = TableKind::ALL
            .into_iter()
            .map(|kind| {
                let df = raw.get(kind);
                TableOverview {
                    table: kind.name().to_string(),
                    rows: df.height(),
                    columns: df.width(),
                    missing: MissingnessAnalyzer::analyze(df),
                }
            })
            .collect();

        Ok(InspectionReport {
            generated_at: timestamp(),
            tables,
        })
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn finish(&self, result: Result<PipelineOutput>) -> Result<PipelineOutput> {
        match result {
            Ok(output) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(output)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn load(&self) -> Result<RawTables> {
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            0.0,
            format!("Loading tables from {}...", self.config.data_dir.display()),
        ));
        let raw = Loader::new(&self.config).load_all()?;
        self.report_progress(ProgressUpdate::new(PipelineStage::Loading, 1.0, "Tables loaded"));
        Ok(raw)
    }

    fn process(&self, raw: &RawTables) -> Result<PipelineOutput> {
        let start_time = Instant::now();
        let executor = StageExecutor::new(&self.config);

        // Step 1: clean every table
        info!("Step 1: Cleaning tables...");
        let total = TableKind::ALL.len();
        let cleaned = executor.clean_all(raw, |kind, done| {
            self.report_progress(ProgressUpdate::with_items(
                PipelineStage::Cleaning,
                format!("Table: {}", kind),
                done,
                total,
                format!("Cleaned {}", kind),
            ));
        })?;

        // Step 2: weather join and derived features
        info!("Step 2: Building features...");
        self.report_progress(ProgressUpdate::new(
            PipelineStage::FeatureBuilding,
            0.0,
            "Joining weather and deriving features...",
        ));
        let (flights, weather) = match (cleaned.get(&TableKind::Flights), cleaned.get(&TableKind::Weather)) {
            (Some(f), Some(w)) => (f, w),
            _ => {
                return Err(PipelineError::Internal(
                    "flights or weather missing after cleaning".to_string(),
                ));
            }
        };
        let features = executor.build_features(flights, weather)?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::FeatureBuilding,
            1.0,
            format!("{} feature rows", features.frame.height()),
        ));

        // Step 3: one split per task
        info!("Step 3: Splitting...");
        self.report_progress(ProgressUpdate::new(PipelineStage::Splitting, 0.0, "Splitting..."));
        let splits = executor.split_all(&features)?;
        self.report_progress(ProgressUpdate::new(PipelineStage::Splitting, 1.0, "Splits ready"));

        let mut report = PipelineReport {
            generated_at: timestamp(),
            duration_ms: 0,
            settings: RunSettings::from(&self.config),
            tables: cleaned.values().map(|c| c.outcome.clone()).collect(),
            features: features.summary.clone(),
            normalization: features.normalization.clone(),
            splits: splits
                .iter()
                .map(|s| SplitSummary {
                    task: s.task.name.clone(),
                    target: s.task.target.clone(),
                    train_rows: s.split.train.height(),
                    test_rows: s.split.test.height(),
                })
                .collect(),
            warnings: features.warnings.clone(),
            output_files: Vec::new(),
        };

        // Step 4: export
        if self.config.save_to_disk {
            info!("Step 4: Exporting...");
            self.report_progress(ProgressUpdate::new(
                PipelineStage::Exporting,
                0.0,
                format!("Writing outputs to {}...", self.config.output_dir.display()),
            ));
            report.duration_ms = start_time.elapsed().as_millis() as u64;
            self.export(&features, &splits, &mut report)?;
            self.report_progress(ProgressUpdate::new(PipelineStage::Exporting, 1.0, "Outputs written"));
        } else {
            info!("Step 4: Skipping export (save_to_disk disabled)");
        }

        report.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Pipeline finished in {}ms: {} rows dropped, {} values imputed",
            report.duration_ms,
            report.rows_dropped(),
            report.values_imputed()
        );

        Ok(PipelineOutput {
            cleaned,
            features,
            splits,
            report,
        })
    }

    fn export(&self, features: &FeatureTable, splits: &[TaskSplit], report: &mut PipelineReport) -> Result<()> {
        let exporter = Exporter::from_config(&self.config);

        let mut written = vec![exporter.write_table("features", &features.frame)?];
        for task_split in splits {
            let name = &task_split.task.name;
            written.push(exporter.write_table(&format!("{}_train", name), &task_split.split.train)?);
            written.push(exporter.write_table(&format!("{}_test", name), &task_split.split.test)?);
        }

        report.output_files = written.iter().map(|p| p.display().to_string()).collect();
        let report_path = exporter.write_report(report)?;
        report.output_files.push(report_path.display().to_string());
        Ok(())
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure PipelineBuilder is Send (can be moved to another thread during construction)
static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().seed, 11111);
        assert!(pipeline.progress_reporter.is_none());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = PipelineConfig {
            train_fraction: 1.0,
            ..PipelineConfig::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_pipeline_builder_with_progress_callback() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let pipeline = Pipeline::builder()
            .on_progress(move |_update| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        pipeline.report_progress(ProgressUpdate::new(PipelineStage::Loading, 0.5, "Test"));

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_run_reports_failure() {
        let stages = Arc::new(std::sync::Mutex::new(Vec::new()));
        let stages_clone = stages.clone();
        let config = PipelineConfig::builder()
            .data_dir("/nonexistent/flight-prep-data")
            .build()
            .unwrap();

        let pipeline = Pipeline::builder()
            .config(config)
            .on_progress(move |update| {
                stages_clone.lock().unwrap().push(update.stage);
            })
            .build()
            .unwrap();

        assert!(pipeline.run().is_err());
        let stages = stages.lock().unwrap();
        assert_eq!(stages.first(), Some(&PipelineStage::Loading));
        assert_eq!(stages.last(), Some(&PipelineStage::Failed));
    }
}
