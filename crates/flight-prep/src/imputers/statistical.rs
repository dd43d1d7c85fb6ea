//! Statistical imputation methods.
//!
//! Statistics are computed in one pass ([`StatisticalImputer::plan`]) and
//! applied in a second ([`StatisticalImputer::apply`]), so every missing cell
//! of a column gets the same value no matter how many are filled.

use crate::cleaner::{FillValue, Imputation, ImputeStrategy};
use crate::error::{PipelineError, Result};
use crate::types::ImputedColumn;
use crate::utils::{
    fill_numeric_nulls, fill_string_nulls, is_integer_dtype, is_numeric_dtype, series_of,
    string_mode, string_values,
};
use polars::prelude::*;
use tracing::debug;

/// A fill value computed for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Statistic {
    Number(f64),
    Text(String),
}

/// The value one column will be filled with.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputationPlan {
    pub column: String,
    pub strategy: &'static str,
    pub statistic: Statistic,
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Median of the non-null values of a numeric series.
    pub fn median(series: &Series) -> Result<f64> {
        series
            .median()
            .ok_or_else(|| PipelineError::NoValidValues(series.name().to_string()))
    }

    /// Mean of the non-null values of a numeric series.
    pub fn mean(series: &Series) -> Result<f64> {
        series
            .mean()
            .ok_or_else(|| PipelineError::NoValidValues(series.name().to_string()))
    }

    /// Most frequent non-null value; ties go to the value seen first.
    pub fn mode(series: &Series) -> Result<String> {
        string_mode(&string_values(series)?)
            .ok_or_else(|| PipelineError::NoValidValues(series.name().to_string()))
    }

    /// Compute the fill value of every imputation against `df`.
    ///
    /// Strategies are checked against the column types: statistical numeric
    /// strategies and numeric constants need a numeric column, mode and
    /// text constants need a string column.
    pub fn plan(df: &DataFrame, table: &str, imputations: &[Imputation]) -> Result<Vec<ImputationPlan>> {
        let mut plans = Vec::with_capacity(imputations.len());

        for imputation in imputations {
            let series = series_of(df, table, &imputation.column)?;
            let numeric = is_numeric_dtype(series.dtype());
            let text = matches!(series.dtype(), DataType::String);

            let statistic = match (&imputation.strategy, numeric, text) {
                (ImputeStrategy::Median, true, _) => Statistic::Number(Self::median(series)?),
                (ImputeStrategy::Mean, true, _) => Statistic::Number(Self::mean(series)?),
                (ImputeStrategy::Mode, _, true) => Statistic::Text(Self::mode(series)?),
                (ImputeStrategy::Constant(FillValue::Number(v)), true, _) => Statistic::Number(*v),
                (ImputeStrategy::Constant(FillValue::Text(v)), _, true) => {
                    Statistic::Text(v.clone())
                }
                (strategy, _, _) => {
                    return Err(PipelineError::InvalidConfig(format!(
                        "strategy '{}' cannot fill column '{}.{}' of type {:?}",
                        strategy.label(),
                        table,
                        imputation.column,
                        series.dtype()
                    )));
                }
            };

            // integer columns are filled with the rounded statistic
            let statistic = match statistic {
                Statistic::Number(v) if is_integer_dtype(series.dtype()) => {
                    Statistic::Number(v.round())
                }
                other => other,
            };

            debug!(
                "Planned {} fill for '{}': {:?}",
                imputation.strategy.label(),
                imputation.column,
                statistic
            );

            plans.push(ImputationPlan {
                column: imputation.column.clone(),
                strategy: imputation.strategy.label(),
                statistic,
            });
        }

        Ok(plans)
    }

    /// Fill the missing values described by `plans`, returning a new frame.
    pub fn apply(df: &DataFrame, plans: &[ImputationPlan]) -> Result<(DataFrame, Vec<ImputedColumn>)> {
        let mut out = df.clone();
        let mut imputed = Vec::with_capacity(plans.len());

        for plan in plans {
            let series = out
                .column(&plan.column)
                .map_err(|_| PipelineError::unknown_column("<imputation>", &plan.column))?
                .as_materialized_series()
                .clone();
            let filled_count = series.null_count();

            let (filled, rendered) = match &plan.statistic {
                Statistic::Number(v) => {
                    let rendered = if is_integer_dtype(series.dtype()) {
                        format!("{}", *v as i64)
                    } else {
                        format!("{:.2}", v)
                    };
                    (fill_numeric_nulls(&series, *v)?, rendered)
                }
                Statistic::Text(v) => (fill_string_nulls(&series, v)?, v.clone()),
            };
            out.replace(&plan.column, filled)?;

            imputed.push(ImputedColumn {
                column: plan.column.clone(),
                strategy: plan.strategy.to_string(),
                value: rendered,
                filled: filled_count,
            });
        }

        Ok((out, imputed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imputation(column: &str, strategy: ImputeStrategy) -> Imputation {
        Imputation {
            column: column.to_string(),
            strategy,
        }
    }

    fn run(df: &DataFrame, imputations: &[Imputation]) -> Result<(DataFrame, Vec<ImputedColumn>)> {
        let plans = StatisticalImputer::plan(df, "t", imputations)?;
        StatisticalImputer::apply(df, &plans)
    }

    #[test]
    fn test_median_fill() {
        let df = df![
            "values" => [Some(1.0), None, Some(3.0), None, Some(5.0)],
        ]
        .unwrap();

        let (out, steps) = run(&df, &[imputation("values", ImputeStrategy::Median)]).unwrap();

        let values = out.column("values").unwrap().f64().unwrap();
        assert_eq!(values.null_count(), 0);
        assert_eq!(values.get(1), Some(3.0));
        assert_eq!(values.get(3), Some(3.0));
        assert_eq!(steps[0].filled, 2);
        assert_eq!(steps[0].strategy, "median");
        assert_eq!(steps[0].value, "3.00");
    }

    #[test]
    fn test_mean_fill_preserves_original_values() {
        let df = df!["wind_speed" => [Some(10.0), None, Some(20.0)]].unwrap();

        let (out, _) = run(&df, &[imputation("wind_speed", ImputeStrategy::Mean)]).unwrap();

        let values = out.column("wind_speed").unwrap().f64().unwrap();
        assert_eq!(values.get(0), Some(10.0));
        assert_eq!(values.get(1), Some(15.0));
        assert_eq!(values.get(2), Some(20.0));
    }

    #[test]
    fn test_integer_median_is_rounded() {
        let df = df!["dep_time" => [Some(500i64), Some(601), None]].unwrap();

        let (out, steps) = run(&df, &[imputation("dep_time", ImputeStrategy::Median)]).unwrap();

        let values = out.column("dep_time").unwrap();
        assert_eq!(values.dtype(), &DataType::Int64);
        // median 550.5 rounds half away from zero
        assert_eq!(values.i64().unwrap().get(2), Some(551));
        assert_eq!(steps[0].value, "551");
    }

    #[test]
    fn test_statistics_computed_once_before_filling() {
        // filling must not feed back into the statistic of later rows
        let df = df!["v" => [Some(1.0), None, None, Some(100.0), None]].unwrap();
        let (out, _) = run(&df, &[imputation("v", ImputeStrategy::Mean)]).unwrap();
        let values = out.column("v").unwrap().f64().unwrap();
        assert_eq!(values.get(1), Some(50.5));
        assert_eq!(values.get(2), Some(50.5));
        assert_eq!(values.get(4), Some(50.5));
    }

    #[test]
    fn test_mode_fill() {
        let df = df![
            "manufacturer" => [Some("BOEING"), Some("AIRBUS"), Some("BOEING"), None],
        ]
        .unwrap();

        let (out, _) = run(&df, &[imputation("manufacturer", ImputeStrategy::Mode)]).unwrap();

        let values = out.column("manufacturer").unwrap().str().unwrap();
        assert_eq!(values.get(3), Some("BOEING"));
    }

    #[test]
    fn test_mode_tie_uses_first_occurrence() {
        let df = df!["engine" => [Some("Turbo-fan"), Some("Turbo-jet"), None, Some("Turbo-jet"), Some("Turbo-fan")]]
            .unwrap();
        let (out, _) = run(&df, &[imputation("engine", ImputeStrategy::Mode)]).unwrap();
        assert_eq!(out.column("engine").unwrap().str().unwrap().get(2), Some("Turbo-fan"));
    }

    #[test]
    fn test_constant_fills() {
        let df = df![
            "precip" => [Some(0.5), None],
            "tailnum" => [None, Some("N14228")],
        ]
        .unwrap();

        let (out, _) = run(
            &df,
            &[
                imputation("precip", ImputeStrategy::number(0.0)),
                imputation("tailnum", ImputeStrategy::text("unknown")),
            ],
        )
        .unwrap();

        assert_eq!(out.column("precip").unwrap().f64().unwrap().get(1), Some(0.0));
        assert_eq!(out.column("tailnum").unwrap().str().unwrap().get(0), Some("unknown"));
    }

    #[test]
    fn test_all_null_column_has_no_statistic() {
        let df = df!["values" => [Option::<f64>::None, None, None]].unwrap();
        let err = run(&df, &[imputation("values", ImputeStrategy::Median)]).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidValues(ref c) if c == "values"));
    }

    #[test]
    fn test_mismatched_strategy_is_config_error() {
        let df = df!["carrier" => [Some("AA"), None]].unwrap();
        let err = run(&df, &[imputation("carrier", ImputeStrategy::Median)]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));

        let df = df!["seats" => [Some(2.0), None]].unwrap();
        let err = run(&df, &[imputation("seats", ImputeStrategy::Mode)]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn test_nonexistent_column() {
        let df = df!["other" => [1.0, 2.0]].unwrap();
        let err = run(&df, &[imputation("values", ImputeStrategy::Median)]).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownColumn { .. }));
    }
}
