//! Stage execution.
//!
//! Each stage takes the previous stage's output by reference and returns
//! new frames, so a failed stage leaves earlier results untouched.

use crate::cleaner::{CleanedTable, Cleaner};
use crate::config::PipelineConfig;
use crate::datasets::{self, SplitTask};
use crate::error::{Result, ResultExt};
use crate::features::{FeatureBuilder, FeatureTable};
use crate::loader::RawTables;
use crate::split::{Split, SplitSpec, Splitter};
use crate::types::TableKind;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The split of one task.
#[derive(Debug, Clone)]
pub struct TaskSplit {
    pub task: SplitTask,
    pub split: Split,
}

/// Runs the cleaning, feature and split stages for a configuration.
pub struct StageExecutor<'a> {
    config: &'a PipelineConfig,
    cleaner: Cleaner,
}

impl<'a> StageExecutor<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            cleaner: Cleaner::new(config.missing_markers.clone()),
        }
    }

    /// Clean one table with its configured rule.
    pub fn clean_table(&self, kind: TableKind, raw: &RawTables) -> Result<CleanedTable> {
        let rule = self.config.rule_for(kind);
        self.cleaner
            .clean(raw.get(kind), &datasets::schema(kind), &rule)
            .context(format!("Cleaning '{}' failed", kind))
    }

    /// Clean every table, calling `on_table` after each one.
    pub fn clean_all<F>(&self, raw: &RawTables, mut on_table: F) -> Result<BTreeMap<TableKind, CleanedTable>>
    where
        F: FnMut(TableKind, usize),
    {
        let mut cleaned = BTreeMap::new();
        for (i, kind) in TableKind::ALL.into_iter().enumerate() {
            cleaned.insert(kind, self.clean_table(kind, raw)?);
            on_table(kind, i + 1);
        }
        Ok(cleaned)
    }

    pub fn build_features(&self, flights: &CleanedTable, weather: &CleanedTable) -> Result<FeatureTable> {
        FeatureBuilder::build(&flights.frame, &weather.frame, &self.config.feature_plan())
            .context("Feature building failed")
    }

    /// Split the feature table once per task, all with the same seed.
    pub fn split_all(&self, features: &FeatureTable) -> Result<Vec<TaskSplit>> {
        let mut splits = Vec::new();
        for task in self.config.tasks() {
            let spec = SplitSpec {
                target: task.target.clone(),
                fraction: self.config.train_fraction,
                seed: self.config.seed,
                stratify: task.stratify,
            };
            debug!("Splitting '{}' task on '{}'", task.name, task.target);
            let split = Splitter::split(&features.frame, &spec)
                .context(format!("Splitting '{}' failed", task.name))?;
            info!(
                "Task '{}': {} train / {} test rows",
                task.name,
                split.train.height(),
                split.test.height()
            );
            splits.push(TaskSplit { task, split });
        }
        Ok(splits)
    }
}
