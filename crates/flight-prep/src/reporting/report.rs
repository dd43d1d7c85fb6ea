use crate::config::PipelineConfig;
use crate::types::{
    CleaningOutcome, FeatureSummary, MissingnessReport, NormalizedColumn, PipelineWarning, TableKind,
};
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Row counts of one task's split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub task: String,
    pub target: String,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Settings that decide the content of the outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub seed: u64,
    pub train_fraction: f64,
    pub late_threshold: f64,
    pub drop_threshold: f64,
    pub regression_bins: usize,
    pub carrier_keep: Vec<String>,
}

impl From<&PipelineConfig> for RunSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            seed: config.seed,
            train_fraction: config.train_fraction,
            late_threshold: config.late_threshold,
            drop_threshold: config.drop_threshold,
            regression_bins: config.regression_bins,
            carrier_keep: config.carrier_keep.clone(),
        }
    }
}

/// Everything a run did, for `report.json` and `--json` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    pub duration_ms: u64,
    pub settings: RunSettings,
    /// Cleaning record of every table, in table order
    pub tables: Vec<CleaningOutcome>,
    pub features: FeatureSummary,
    pub normalization: Vec<NormalizedColumn>,
    pub splits: Vec<SplitSummary>,
    pub warnings: Vec<PipelineWarning>,
    /// Files written by the exporter
    #[serde(default)]
    pub output_files: Vec<String>,
}

impl PipelineReport {
    pub fn outcome(&self, table: TableKind) -> Option<&CleaningOutcome> {
        self.tables.iter().find(|t| t.table == table.name())
    }

    pub fn rows_dropped(&self) -> usize {
        self.tables.iter().map(|t| t.rows_dropped()).sum()
    }

    pub fn values_imputed(&self) -> usize {
        self.tables
            .iter()
            .flat_map(|t| t.imputed.iter())
            .map(|c| c.filled)
            .sum()
    }
}

/// Shape and missingness of one loaded table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOverview {
    pub table: String,
    pub rows: usize,
    pub columns: usize,
    pub missing: MissingnessReport,
}

/// Result of a dry run: tables loaded and inspected, nothing cleaned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionReport {
    pub generated_at: String,
    pub tables: Vec<TableOverview>,
}

pub(crate) fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
