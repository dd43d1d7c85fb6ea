//! Table cleaning.
//!
//! One [`Cleaner`] serves all five tables. Per-table behaviour lives in a
//! [`CleaningRule`], and a run goes through fixed phases:
//!
//! 1. rule validation against the table's columns
//! 2. typed coercion of the declared schema
//! 3. the drop phase (criteria in declared order)
//! 4. the impute phase (statistics computed once over the post-drop table)
//! 5. a missingness check of the result
//!
//! The input frame is never modified; every phase produces a new frame.

mod coercion;
mod rules;

pub use coercion::{coerce_schema, coerce_series, parse_timestamp_millis};
pub use rules::{
    CleaningRule, DropCriterion, FillValue, Imputation, ImputeStrategy, ThresholdComparison,
};

use crate::error::{PipelineError, Result};
use crate::imputers::StatisticalImputer;
use crate::quality::MissingnessAnalyzer;
use crate::types::{CleaningOutcome, DropCount, TableSchema};
use crate::utils::{DEFAULT_MISSING_MARKERS, mask_from, null_flags, require_columns, series_of};
use polars::prelude::*;
use tracing::{debug, info};

/// A cleaned table together with the record of how it was produced.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub frame: DataFrame,
    pub outcome: CleaningOutcome,
}

/// Applies [`CleaningRule`]s to tables.
#[derive(Debug, Clone)]
pub struct Cleaner {
    markers: Vec<String>,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(DEFAULT_MISSING_MARKERS.iter().map(|m| m.to_string()).collect())
    }
}

impl Cleaner {
    /// Create a cleaner that treats `markers` (and empty cells) as missing.
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    /// Clean `df` according to `schema` and `rule`.
    ///
    /// # Errors
    ///
    /// - `UnknownColumn` if the rule or schema names a column `df` lacks
    /// - `TypeCoercion` if a declared numeric/timestamp value cannot be parsed
    /// - `DataLoss` if the table is empty or the drop phase removes every row
    /// - `NoValidValues` if a statistic has nothing to be computed from
    pub fn clean(&self, df: &DataFrame, schema: &TableSchema, rule: &CleaningRule) -> Result<CleanedTable> {
        let table = schema.table.as_str();
        info!("Cleaning '{}' with rule '{}'...", table, rule.name);

        rule.validate()?;
        require_columns(df, table, rule.referenced_columns())?;

        let typed = coerce_schema(df, schema, &self.markers)?;
        let rows_before = typed.height();
        if rows_before == 0 {
            return Err(PipelineError::DataLoss {
                table: table.to_string(),
                rows_before,
            });
        }

        let missing_before = MissingnessAnalyzer::analyze(&typed);

        let (kept, dropped) = Self::drop_phase(&typed, table, &rule.drop)?;
        if kept.height() == 0 {
            return Err(PipelineError::DataLoss {
                table: table.to_string(),
                rows_before,
            });
        }

        let plans = StatisticalImputer::plan(&kept, table, &rule.impute)?;
        let (frame, imputed) = StatisticalImputer::apply(&kept, &plans)?;

        let missing_after = MissingnessAnalyzer::analyze(&frame);
        let resolved = rule.resolved_columns();
        let violations = MissingnessAnalyzer::verify(&missing_before, &missing_after, &resolved, &resolved);
        if let Some(v) = violations.first() {
            return Err(PipelineError::Internal(format!(
                "column '{}.{}' still has {} missing values after imputation",
                table, v.column, v.after
            )));
        }

        info!(
            "Cleaned '{}': {} -> {} rows, {} -> {} missing values",
            table,
            rows_before,
            frame.height(),
            missing_before.total(),
            missing_after.total()
        );

        Ok(CleanedTable {
            outcome: CleaningOutcome {
                table: table.to_string(),
                rule: rule.name.clone(),
                rows_before,
                rows_after: frame.height(),
                dropped,
                imputed,
                missing_before,
                missing_after,
            },
            frame,
        })
    }

    /// Remove records matching any criterion, applying criteria in order.
    ///
    /// Each criterion sees the output of the previous one.
    pub fn drop_phase(
        df: &DataFrame,
        table: &str,
        criteria: &[DropCriterion],
    ) -> Result<(DataFrame, Vec<DropCount>)> {
        let mut current = df.clone();
        let mut counts = Vec::with_capacity(criteria.len());

        for criterion in criteria {
            let mut missing = vec![0usize; current.height()];
            for column in criterion.columns() {
                let flags = null_flags(series_of(&current, table, column)?);
                for (count, is_null) in missing.iter_mut().zip(flags) {
                    *count += usize::from(is_null);
                }
            }

            let keep: Vec<bool> = missing.iter().map(|&m| !criterion.should_drop(m)).collect();
            let removed = keep.iter().filter(|k| !**k).count();
            if removed > 0 {
                current = current.filter(&mask_from(&keep))?;
            }

            debug!(
                "Drop criterion '{}' on '{}' removed {} rows",
                criterion.describe(),
                table,
                removed
            );
            counts.push(DropCount {
                criterion: criterion.describe(),
                rows: removed,
            });
        }

        Ok((current, counts))
    }
}
