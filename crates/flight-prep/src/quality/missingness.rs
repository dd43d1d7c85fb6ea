//! Per-column missing-value counts.

use crate::types::{ColumnMissing, MissingnessReport};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Computes [`MissingnessReport`]s for table snapshots.
pub struct MissingnessAnalyzer;

/// A column whose missing count does not meet a cleaning post-condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingnessViolation {
    pub column: String,
    pub before: usize,
    pub after: usize,
    pub expected_resolved: bool,
}

impl MissingnessAnalyzer {
    /// Count missing values per column, keeping only columns with at least one.
    pub fn analyze(df: &DataFrame) -> MissingnessReport {
        let columns = df
            .get_columns()
            .iter()
            .filter_map(|col| {
                let missing = col.null_count();
                (missing > 0).then(|| ColumnMissing {
                    column: col.name().to_string(),
                    missing,
                })
            })
            .collect();

        MissingnessReport {
            rows: df.height(),
            columns,
        }
    }

    /// Check a before/after pair against the cleaning contract.
    ///
    /// Every column in `imputed` must not have gained missing values, and
    /// every column in `resolved` must have none left.
    pub fn verify(
        before: &MissingnessReport,
        after: &MissingnessReport,
        imputed: &[String],
        resolved: &[String],
    ) -> Vec<MissingnessViolation> {
        let mut violations = Vec::new();

        for column in imputed {
            let (b, a) = (before.count(column), after.count(column));
            if a > b {
                violations.push(MissingnessViolation {
                    column: column.clone(),
                    before: b,
                    after: a,
                    expected_resolved: false,
                });
            }
        }

        for column in resolved {
            let (b, a) = (before.count(column), after.count(column));
            if a != 0 && !violations.iter().any(|v| &v.column == column) {
                violations.push(MissingnessViolation {
                    column: column.clone(),
                    before: b,
                    after: a,
                    expected_resolved: true,
                });
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_lists_only_columns_with_missing_values() {
        let df = df![
            "dep_time" => [Some(517i64), None, Some(533)],
            "carrier" => [Some("UA"), Some("AA"), Some("B6")],
            "air_time" => [None, None, Some(160.0)],
        ]
        .unwrap();

        let report = MissingnessAnalyzer::analyze(&df);

        assert_eq!(report.rows, 3);
        assert_eq!(report.column_names(), vec!["dep_time", "air_time"]);
        assert_eq!(report.count("dep_time"), 1);
        assert_eq!(report.count("air_time"), 2);
        assert_eq!(report.count("carrier"), 0);
    }

    #[test]
    fn test_analyze_is_stable() {
        let df = df!["x" => [Some(1.0), None]].unwrap();
        assert_eq!(
            MissingnessAnalyzer::analyze(&df),
            MissingnessAnalyzer::analyze(&df)
        );
    }

    #[test]
    fn test_verify_flags_unresolved_and_worsened_columns() {
        let before = MissingnessAnalyzer::analyze(
            &df![
                "a" => [None, Some(1.0)],
                "b" => [None, Some(1.0)],
            ]
            .unwrap(),
        );
        let after = MissingnessAnalyzer::analyze(
            &df![
                "a" => [None::<f64>, None],
                "b" => [Some(0.0), Some(1.0)],
            ]
            .unwrap(),
        );

        let imputed = vec!["a".to_string(), "b".to_string()];
        let violations = MissingnessAnalyzer::verify(&before, &after, &imputed, &imputed);

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].column, "a");
        assert_eq!(violations[0].after, 2);
    }

    #[test]
    fn test_verify_passes_clean_result() {
        let before = MissingnessAnalyzer::analyze(&df!["a" => [None, Some(1.0)]].unwrap());
        let after = MissingnessAnalyzer::analyze(&df!["a" => [Some(1.0), Some(1.0)]].unwrap());
        let cols = vec!["a".to_string()];
        assert!(MissingnessAnalyzer::verify(&before, &after, &cols, &cols).is_empty());
    }
}
