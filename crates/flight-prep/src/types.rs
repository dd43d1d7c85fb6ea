use polars::prelude::{DataType, TimeUnit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five source tables of the study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Airlines,
    Airports,
    Flights,
    Planes,
    Weather,
}

impl TableKind {
    pub const ALL: [TableKind; 5] = [
        TableKind::Airlines,
        TableKind::Airports,
        TableKind::Flights,
        TableKind::Planes,
        TableKind::Weather,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Airlines => "airlines",
            Self::Airports => "airports",
            Self::Flights => "flights",
            Self::Planes => "planes",
            Self::Weather => "weather",
        }
    }

    /// File name of the table inside the data directory.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name())
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Semantic type of a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Whole numbers, stored as `Int64`.
    Integer,
    /// Real numbers, stored as `Float64`.
    Real,
    /// Free-form category labels, stored as `String`.
    Categorical,
    /// Date-times, stored as millisecond `Datetime` without a time zone.
    Timestamp,
}

impl SemanticType {
    /// The polars type a column of this semantic type is stored as.
    pub fn dtype(&self) -> DataType {
        match self {
            Self::Integer => DataType::Int64,
            Self::Real => DataType::Float64,
            Self::Categorical => DataType::String,
            Self::Timestamp => DataType::Datetime(TimeUnit::Milliseconds, None),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Categorical => "categorical",
            Self::Timestamp => "timestamp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub semantic: SemanticType,
}

/// Ordered column declarations of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Append a column declaration.
    pub fn column(mut self, name: impl Into<String>, semantic: SemanticType) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            semantic,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<SemanticType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.semantic)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Missing count of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing: usize,
}

/// Per-column missing-value counts of one table snapshot.
///
/// Only columns with at least one missing value are listed, in the
/// snapshot's column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingnessReport {
    pub rows: usize,
    pub columns: Vec<ColumnMissing>,
}

impl MissingnessReport {
    /// Missing count of `column`; zero when the column is not listed.
    pub fn count(&self, column: &str) -> usize {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.missing)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.missing).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column.as_str()).collect()
    }
}

/// Non-fatal conditions observed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// The right-hand side of a join had duplicate keys; the first row of
    /// each key was used.
    JoinCardinality {
        right_table: String,
        duplicate_keys: usize,
        ignored_rows: usize,
    },
}

impl PipelineWarning {
    pub fn message(&self) -> String {
        match self {
            Self::JoinCardinality {
                right_table,
                duplicate_keys,
                ignored_rows,
            } => format!(
                "'{}' has {} duplicated join keys; {} rows ignored (first match wins)",
                right_table, duplicate_keys, ignored_rows
            ),
        }
    }
}

/// Rows removed by one drop criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCount {
    pub criterion: String,
    pub rows: usize,
}

/// What the impute phase did to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputedColumn {
    pub column: String,
    pub strategy: String,
    /// The fill value, rendered as text.
    pub value: String,
    pub filled: usize,
}

/// Record of a single cleaning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningOutcome {
    pub table: String,
    pub rule: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub dropped: Vec<DropCount>,
    pub imputed: Vec<ImputedColumn>,
    pub missing_before: MissingnessReport,
    pub missing_after: MissingnessReport,
}

impl CleaningOutcome {
    pub fn rows_dropped(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Observed range used to min-max scale a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedColumn {
    pub column: String,
    pub params: NormalizationParams,
}

/// Row accounting of the feature-building stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub rows_in: usize,
    pub unmatched_rows: usize,
    pub rows_dropped_post_join: usize,
    pub rows_out: usize,
    pub derived_columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema = TableSchema::new("t")
            .column("a", SemanticType::Integer)
            .column("b", SemanticType::Categorical);
        assert_eq!(schema.get("a"), Some(SemanticType::Integer));
        assert_eq!(schema.get("z"), None);
        assert_eq!(schema.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_missingness_report_count_defaults_to_zero() {
        let report = MissingnessReport {
            rows: 10,
            columns: vec![ColumnMissing {
                column: "temp".to_string(),
                missing: 3,
            }],
        };
        assert_eq!(report.count("temp"), 3);
        assert_eq!(report.count("humid"), 0);
        assert_eq!(report.total(), 3);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_warning_serialization_is_tagged() {
        let warning = PipelineWarning::JoinCardinality {
            right_table: "weather".to_string(),
            duplicate_keys: 2,
            ignored_rows: 3,
        };
        let json = serde_json::to_string(&warning).unwrap();
        assert!(json.contains("\"kind\":\"join_cardinality\""));
        assert!(warning.message().contains("first match wins"));
    }
}
