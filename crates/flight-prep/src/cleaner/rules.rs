//! Declarative cleaning rules.
//!
//! A [`CleaningRule`] is plain data: the same [`super::Cleaner`] runs every
//! table, only the rule differs. Rules round-trip through JSON so they can be
//! overridden from a configuration file.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// How a missing fraction is compared against a drop threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdComparison {
    /// Drop when the fraction is strictly above the threshold.
    #[default]
    GreaterThan,
    /// Drop when the fraction is at or above the threshold.
    AtLeast,
}

/// Criticality predicate of the drop phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropCriterion {
    /// Drop a record if every listed column is missing.
    AllMissing { columns: Vec<String> },
    /// Drop a record if any listed column is missing.
    AnyMissing { columns: Vec<String> },
    /// Drop a record if the missing share of the listed columns crosses
    /// `threshold`.
    FractionMissing {
        columns: Vec<String>,
        threshold: f64,
        #[serde(default)]
        comparison: ThresholdComparison,
    },
}

impl DropCriterion {
    pub fn all_missing<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::AllMissing {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn any_missing<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::AnyMissing {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fraction_missing<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        threshold: f64,
        comparison: ThresholdComparison,
    ) -> Self {
        Self::FractionMissing {
            columns: columns.into_iter().map(Into::into).collect(),
            threshold,
            comparison,
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            Self::AllMissing { columns }
            | Self::AnyMissing { columns }
            | Self::FractionMissing { columns, .. } => columns,
        }
    }

    /// Decide whether a record with `missing` nulls among [`Self::columns`]
    /// is dropped.
    pub fn should_drop(&self, missing: usize) -> bool {
        let total = self.columns().len();
        match self {
            Self::AllMissing { .. } => total > 0 && missing == total,
            Self::AnyMissing { .. } => missing > 0,
            Self::FractionMissing {
                threshold,
                comparison,
                ..
            } => {
                if total == 0 {
                    return false;
                }
                let fraction = missing as f64 / total as f64;
                match comparison {
                    ThresholdComparison::GreaterThan => fraction > *threshold,
                    ThresholdComparison::AtLeast => fraction >= *threshold,
                }
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::AllMissing { columns } => format!("all missing of [{}]", columns.join(", ")),
            Self::AnyMissing { columns } => format!("any missing of [{}]", columns.join(", ")),
            Self::FractionMissing {
                columns,
                threshold,
                comparison,
            } => {
                let op = match comparison {
                    ThresholdComparison::GreaterThan => ">",
                    ThresholdComparison::AtLeast => ">=",
                };
                format!(
                    "missing share {} {:.0}% of [{}]",
                    op,
                    threshold * 100.0,
                    columns.join(", ")
                )
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.columns().is_empty() {
            return Err(PipelineError::InvalidConfig(format!(
                "drop criterion '{}' lists no columns",
                self.describe()
            )));
        }
        if let Self::FractionMissing { threshold, .. } = self
            && !(0.0..=1.0).contains(threshold)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "drop threshold {} must be between 0.0 and 1.0",
                threshold
            )));
        }
        Ok(())
    }
}

/// A fixed replacement value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

/// How one column's missing values are filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Median of the non-missing values (numeric).
    Median,
    /// Mean of the non-missing values (numeric).
    Mean,
    /// Most frequent non-missing value (categorical).
    Mode,
    /// A fixed sentinel.
    Constant(FillValue),
}

impl ImputeStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Mean => "mean",
            Self::Mode => "mode",
            Self::Constant(_) => "constant",
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Constant(FillValue::Text(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Self::Constant(FillValue::Number(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputation {
    pub column: String,
    #[serde(flatten)]
    pub strategy: ImputeStrategy,
}

/// Named, ordered drop criteria followed by per-column imputations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningRule {
    pub name: String,
    #[serde(default)]
    pub drop: Vec<DropCriterion>,
    #[serde(default)]
    pub impute: Vec<Imputation>,
}

impl CleaningRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            drop: Vec::new(),
            impute: Vec::new(),
        }
    }

    /// Append a drop criterion; criteria run in insertion order.
    pub fn drop_when(mut self, criterion: DropCriterion) -> Self {
        self.drop.push(criterion);
        self
    }

    /// Append an imputation for `column`.
    pub fn impute(mut self, column: impl Into<String>, strategy: ImputeStrategy) -> Self {
        self.impute.push(Imputation {
            column: column.into(),
            strategy,
        });
        self
    }

    /// Every column the rule references, in declaration order.
    pub fn referenced_columns(&self) -> Vec<&String> {
        let mut columns: Vec<&String> = Vec::new();
        let drop_cols = self.drop.iter().flat_map(|c| c.columns().iter());
        let impute_cols = self.impute.iter().map(|i| &i.column);
        for column in drop_cols.chain(impute_cols) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }

    /// Columns the impute phase must leave without missing values.
    pub fn resolved_columns(&self) -> Vec<String> {
        self.impute.iter().map(|i| i.column.clone()).collect()
    }

    /// Structural checks that do not need the table.
    pub fn validate(&self) -> Result<()> {
        for criterion in &self.drop {
            criterion.validate()?;
        }
        for (i, imputation) in self.impute.iter().enumerate() {
            if self.impute[..i].iter().any(|p| p.column == imputation.column) {
                return Err(PipelineError::InvalidConfig(format!(
                    "rule '{}' imputes column '{}' twice",
                    self.name, imputation.column
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_missing_requires_every_column() {
        let c = DropCriterion::all_missing(["dep_time", "arr_time"]);
        assert!(!c.should_drop(0));
        assert!(!c.should_drop(1));
        assert!(c.should_drop(2));
    }

    #[test]
    fn test_fraction_boundary_strict_keeps_exact_half() {
        let cols = ["a", "b", "c", "d"];
        let strict = DropCriterion::fraction_missing(cols, 0.5, ThresholdComparison::GreaterThan);
        let inclusive = DropCriterion::fraction_missing(cols, 0.5, ThresholdComparison::AtLeast);

        // exactly 2 of 4 missing sits on the boundary
        assert!(!strict.should_drop(2));
        assert!(inclusive.should_drop(2));

        assert!(strict.should_drop(3));
        assert!(!inclusive.should_drop(1));
    }

    #[test]
    fn test_fraction_over_nine_key_columns() {
        let cols = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];
        let c = DropCriterion::fraction_missing(cols, 0.5, ThresholdComparison::GreaterThan);
        assert!(!c.should_drop(4));
        assert!(c.should_drop(5));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let rule = CleaningRule::new("w").drop_when(DropCriterion::fraction_missing(
            ["a"],
            1.5,
            ThresholdComparison::GreaterThan,
        ));
        assert!(matches!(rule.validate(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_imputation() {
        let rule = CleaningRule::new("f")
            .impute("air_time", ImputeStrategy::Median)
            .impute("air_time", ImputeStrategy::Mean);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_referenced_columns_are_deduplicated() {
        let rule = CleaningRule::new("f")
            .drop_when(DropCriterion::all_missing(["dep_time", "arr_time"]))
            .impute("dep_time", ImputeStrategy::Median)
            .impute("tailnum", ImputeStrategy::text("unknown"));
        let cols: Vec<&str> = rule.referenced_columns().iter().map(|s| s.as_str()).collect();
        assert_eq!(cols, vec!["dep_time", "arr_time", "tailnum"]);
    }

    #[test]
    fn test_rule_json_round_trip() {
        let json = r#"{
            "name": "weather",
            "drop": [
                {"kind": "fraction_missing", "columns": ["temp", "humid"], "threshold": 0.5}
            ],
            "impute": [
                {"column": "temp", "strategy": "mean"},
                {"column": "precip", "strategy": "constant", "value": 0.0},
                {"column": "origin", "strategy": "constant", "value": "unknown"}
            ]
        }"#;
        let rule: CleaningRule = serde_json::from_str(json).unwrap();

        assert_eq!(rule.drop.len(), 1);
        assert!(matches!(
            rule.drop[0],
            DropCriterion::FractionMissing {
                comparison: ThresholdComparison::GreaterThan,
                ..
            }
        ));
        assert_eq!(rule.impute[0].strategy, ImputeStrategy::Mean);
        assert_eq!(rule.impute[1].strategy, ImputeStrategy::number(0.0));
        assert_eq!(rule.impute[2].strategy, ImputeStrategy::text("unknown"));
    }
}
