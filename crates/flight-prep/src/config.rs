//! Configuration types for the flight preparation pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup. A configuration can also be
//! read from a JSON file; missing fields take their defaults.

use crate::cleaner::{CleaningRule, ThresholdComparison};
use crate::datasets::{self, DEFAULT_CARRIER_KEEP, SplitTask};
use crate::error::{PipelineError, Result as PipelineResult, ResultExt};
use crate::features::FeaturePlan;
use crate::types::TableKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File format of exported tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            other => Err(format!("unknown export format '{}' (expected csv or parquet)", other)),
        }
    }
}

/// Per-table replacements for the default cleaning rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOverrides {
    pub airlines: Option<CleaningRule>,
    pub airports: Option<CleaningRule>,
    pub flights: Option<CleaningRule>,
    pub planes: Option<CleaningRule>,
    pub weather: Option<CleaningRule>,
}

impl RuleOverrides {
    pub fn get(&self, kind: TableKind) -> Option<&CleaningRule> {
        match kind {
            TableKind::Airlines => self.airlines.as_ref(),
            TableKind::Airports => self.airports.as_ref(),
            TableKind::Flights => self.flights.as_ref(),
            TableKind::Planes => self.planes.as_ref(),
            TableKind::Weather => self.weather.as_ref(),
        }
    }
}

/// Configuration for the preparation pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use flight_prep::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .data_dir("data")
///     .seed(42)
///     .train_fraction(0.75)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `<table>.csv` for every table.
    /// Default: "data"
    pub data_dir: PathBuf,

    /// Output directory for exported splits and the report.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Field separator of input and exported CSV files.
    /// Default: ';'
    #[serde(with = "separator_char")]
    pub separator: u8,

    /// Cell values read as missing, in addition to empty cells.
    /// Default: ["NA"]
    pub missing_markers: Vec<String>,

    /// Seed of the train/test shuffle.
    /// Default: 11111
    pub seed: u64,

    /// Share of every stratum that goes to the training set.
    /// Default: 0.8
    pub train_fraction: f64,

    /// Arrival delay (minutes) at which a flight counts as late.
    /// Default: 15.0
    pub late_threshold: f64,

    /// Missing share of the weather measurements above which a weather
    /// record is dropped.
    /// Default: 0.5
    pub drop_threshold: f64,

    /// Whether the drop threshold itself already drops.
    /// Default: GreaterThan
    pub drop_comparison: ThresholdComparison,

    /// Carriers kept as their own level in `carrier_group`.
    pub carrier_keep: Vec<String>,

    /// Number of arrival-delay bins used to stratify the regression split.
    /// Default: 5
    pub regression_bins: usize,

    /// Default: Csv
    pub export_format: ExportFormat,

    /// Whether to write splits and the report to disk.
    /// When false, results are kept in memory only.
    /// Default: true
    pub save_to_disk: bool,

    /// Cleaning rules replacing the built-in ones.
    pub rules: Option<RuleOverrides>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            separator: b';',
            missing_markers: vec!["NA".to_string()],
            seed: 11111,
            train_fraction: 0.8,
            late_threshold: 15.0,
            drop_threshold: 0.5,
            drop_comparison: ThresholdComparison::default(),
            carrier_keep: DEFAULT_CARRIER_KEEP.iter().map(|c| c.to_string()).collect(),
            regression_bins: 5,
            export_format: ExportFormat::default(),
            save_to_disk: true,
            rules: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Read a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(PipelineError::from)
            .context(format!("Failed to read config '{}'", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&text)
            .map_err(PipelineError::from)
            .context(format!("Failed to parse config '{}'", path.display()))?;
        config
            .validate()
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(ConfigValidationError::InvalidFraction(self.train_fraction));
        }

        if !(0.0..=1.0).contains(&self.drop_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "drop_threshold".to_string(),
                value: self.drop_threshold,
            });
        }

        if !self.late_threshold.is_finite() {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "late_threshold".to_string(),
                value: self.late_threshold,
            });
        }

        if self.regression_bins == 0 {
            return Err(ConfigValidationError::InvalidBins(self.regression_bins));
        }

        if self.missing_markers.is_empty() {
            return Err(ConfigValidationError::NoMissingMarkers);
        }

        Ok(())
    }

    /// Cleaning rule of `kind`: the override if one is configured, the
    /// built-in rule otherwise.
    pub fn rule_for(&self, kind: TableKind) -> CleaningRule {
        self.rules
            .as_ref()
            .and_then(|r| r.get(kind))
            .cloned()
            .unwrap_or_else(|| datasets::default_rule(kind, self.drop_threshold, self.drop_comparison))
    }

    pub fn feature_plan(&self) -> FeaturePlan {
        datasets::default_feature_plan(&self.carrier_keep, self.late_threshold)
    }

    pub fn tasks(&self) -> Vec<SplitTask> {
        datasets::default_tasks(self.regression_bins)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid train fraction: {0} (must be strictly between 0.0 and 1.0)")]
    InvalidFraction(f64),

    #[error("Invalid regression bins: {0} (must be at least 1)")]
    InvalidBins(usize),

    #[error("At least one missing-value marker is required")]
    NoMissingMarkers,
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    separator: Option<u8>,
    missing_markers: Option<Vec<String>>,
    seed: Option<u64>,
    train_fraction: Option<f64>,
    late_threshold: Option<f64>,
    drop_threshold: Option<f64>,
    drop_comparison: Option<ThresholdComparison>,
    carrier_keep: Option<Vec<String>>,
    regression_bins: Option<usize>,
    export_format: Option<ExportFormat>,
    save_to_disk: Option<bool>,
    rules: Option<RuleOverrides>,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration, e.g. one read from JSON.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            data_dir: Some(config.data_dir),
            output_dir: Some(config.output_dir),
            separator: Some(config.separator),
            missing_markers: Some(config.missing_markers),
            seed: Some(config.seed),
            train_fraction: Some(config.train_fraction),
            late_threshold: Some(config.late_threshold),
            drop_threshold: Some(config.drop_threshold),
            drop_comparison: Some(config.drop_comparison),
            carrier_keep: Some(config.carrier_keep),
            regression_bins: Some(config.regression_bins),
            export_format: Some(config.export_format),
            save_to_disk: Some(config.save_to_disk),
            rules: config.rules,
        }
    }

    /// Set the directory the five tables are read from.
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Set the output directory for splits and the report.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    pub fn separator(mut self, separator: u8) -> Self {
        self.separator = Some(separator);
        self
    }

    pub fn missing_markers(mut self, markers: Vec<String>) -> Self {
        self.missing_markers = Some(markers);
        self
    }

    /// Set the seed of the train/test shuffle.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the training share.
    ///
    /// # Arguments
    /// * `fraction` - Value strictly between 0.0 and 1.0 (e.g., 0.8 = 80%)
    pub fn train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = Some(fraction);
        self
    }

    /// Set the arrival delay at which a flight is late.
    pub fn late_threshold(mut self, minutes: f64) -> Self {
        self.late_threshold = Some(minutes);
        self
    }

    /// Set the weather drop threshold.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.5 = 50%)
    pub fn drop_threshold(mut self, threshold: f64) -> Self {
        self.drop_threshold = Some(threshold);
        self
    }

    pub fn drop_comparison(mut self, comparison: ThresholdComparison) -> Self {
        self.drop_comparison = Some(comparison);
        self
    }

    pub fn carrier_keep(mut self, carriers: Vec<String>) -> Self {
        self.carrier_keep = Some(carriers);
        self
    }

    pub fn regression_bins(mut self, bins: usize) -> Self {
        self.regression_bins = Some(bins);
        self
    }

    pub fn export_format(mut self, format: ExportFormat) -> Self {
        self.export_format = Some(format);
        self
    }

    /// Enable or disable saving splits and the report to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Replace built-in cleaning rules.
    pub fn rules(mut self, rules: RuleOverrides) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            separator: self.separator.unwrap_or(defaults.separator),
            missing_markers: self.missing_markers.unwrap_or(defaults.missing_markers),
            seed: self.seed.unwrap_or(defaults.seed),
            train_fraction: self.train_fraction.unwrap_or(defaults.train_fraction),
            late_threshold: self.late_threshold.unwrap_or(defaults.late_threshold),
            drop_threshold: self.drop_threshold.unwrap_or(defaults.drop_threshold),
            drop_comparison: self.drop_comparison.unwrap_or(defaults.drop_comparison),
            carrier_keep: self.carrier_keep.unwrap_or(defaults.carrier_keep),
            regression_bins: self.regression_bins.unwrap_or(defaults.regression_bins),
            export_format: self.export_format.unwrap_or(defaults.export_format),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
            rules: self.rules,
        };

        config.validate()?;
        Ok(config)
    }
}

/// (De)serializes the separator byte as a one-character string.
mod separator_char {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&(*value as char).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(de::Error::custom(format!(
                "separator must be a single ASCII character, got '{}'",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::ImputeStrategy;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.separator, b';');
        assert_eq!(config.seed, 11111);
        assert_eq!(config.train_fraction, 0.8);
        assert_eq!(config.late_threshold, 15.0);
        assert_eq!(config.drop_comparison, ThresholdComparison::GreaterThan);
        assert_eq!(config.carrier_keep.len(), 6);
        assert!(config.save_to_disk);
    }

    #[test]
    fn test_builder_defaults() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .seed(7)
            .train_fraction(0.7)
            .separator(b',')
            .export_format(ExportFormat::Parquet)
            .save_to_disk(false)
            .build()
            .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.train_fraction, 0.7);
        assert_eq!(config.separator, b',');
        assert_eq!(config.export_format, ExportFormat::Parquet);
        assert!(!config.save_to_disk);
    }

    #[test]
    fn test_validation_invalid_fraction() {
        for fraction in [0.0, 1.0, 1.2] {
            let result = PipelineConfig::builder().train_fraction(fraction).build();
            assert!(matches!(
                result.unwrap_err(),
                ConfigValidationError::InvalidFraction(_)
            ));
        }
    }

    #[test]
    fn test_validation_invalid_threshold_and_bins() {
        let result = PipelineConfig::builder().drop_threshold(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));

        let result = PipelineConfig::builder().regression_bins(0).build();
        assert!(matches!(result.unwrap_err(), ConfigValidationError::InvalidBins(0)));

        let result = PipelineConfig::builder().missing_markers(vec![]).build();
        assert!(matches!(result.unwrap_err(), ConfigValidationError::NoMissingMarkers));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "data_dir": "nycflights",
            "separator": ",",
            "seed": 42,
            "export_format": "parquet",
            "rules": {
                "airlines": {
                    "name": "airlines-strict",
                    "drop": [{"kind": "any_missing", "columns": ["carrier", "name"]}]
                }
            }
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("nycflights"));
        assert_eq!(config.separator, b',');
        assert_eq!(config.seed, 42);
        assert_eq!(config.export_format, ExportFormat::Parquet);
        assert_eq!(config.train_fraction, 0.8);
        assert_eq!(config.rule_for(TableKind::Airlines).name, "airlines-strict");
        assert_eq!(config.rule_for(TableKind::Planes).name, "planes");
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"separator\":\";\""));
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_bad_separator_is_rejected() {
        let err = serde_json::from_str::<PipelineConfig>(r#"{"separator": ";;"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_rule_for_uses_configured_threshold() {
        let config = PipelineConfig::builder()
            .drop_threshold(0.3)
            .drop_comparison(ThresholdComparison::AtLeast)
            .build()
            .unwrap();
        let rule = config.rule_for(TableKind::Weather);
        assert!(rule.drop[0].describe().contains(">= 30%"));
        assert!(rule.impute.iter().any(|i| i.strategy == ImputeStrategy::number(0.0)));
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("parquet".parse::<ExportFormat>(), Ok(ExportFormat::Parquet));
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }
}
