//! Typed parsing of declared columns.
//!
//! Raw tables arrive with every column as text. Each declared column is
//! converted to the storage type of its [`SemanticType`]; a value that still
//! cannot be parsed after decimal-comma normalization is a hard
//! [`PipelineError::TypeCoercion`].

use crate::error::{PipelineError, Result};
use crate::types::{SemanticType, TableSchema};
use crate::utils::{
    f64_values, is_integer_dtype, is_missing_marker, is_numeric_dtype, parse_integer, parse_real,
    string_values,
};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Convert every declared column of `df` to its semantic storage type.
///
/// Columns that are not declared are left untouched. Running this on an
/// already coerced frame returns an equal frame.
pub fn coerce_schema(df: &DataFrame, schema: &TableSchema, markers: &[String]) -> Result<DataFrame> {
    let mut out = df.clone();

    for def in &schema.columns {
        let column = out
            .column(&def.name)
            .map_err(|_| PipelineError::unknown_column(&schema.table, &def.name))?;
        let series = column.as_materialized_series();

        if series.dtype() == &def.semantic.dtype() && def.semantic != SemanticType::Categorical {
            continue;
        }

        let converted = coerce_series(series, def.semantic, markers)?;
        debug!(
            "Coerced {}.{} from {:?} to {}",
            schema.table,
            def.name,
            series.dtype(),
            def.semantic.label()
        );
        out.replace(&def.name, converted)?;
    }

    Ok(out)
}

/// Convert one series to the storage type of `semantic`.
pub fn coerce_series(series: &Series, semantic: SemanticType, markers: &[String]) -> Result<Series> {
    let dtype = series.dtype().clone();
    match (semantic, &dtype) {
        (SemanticType::Integer, DataType::String) => {
            parse_text(series, markers, semantic, parse_integer)
                .map(|values| Series::new(series.name().clone(), values))
        }
        (SemanticType::Real, DataType::String) => {
            parse_text(series, markers, semantic, parse_real)
                .map(|values| Series::new(series.name().clone(), values))
        }
        (SemanticType::Timestamp, DataType::String) => {
            let millis: Vec<Option<i64>> = parse_text(series, markers, semantic, |s| {
                parse_timestamp_millis(s).map(|v| v as i64)
            })?;
            Ok(Series::new(series.name().clone(), millis).cast(&semantic.dtype())?)
        }
        (SemanticType::Categorical, DataType::String) => {
            let values: Vec<Option<String>> = string_values(series)?
                .into_iter()
                .map(|v| v.filter(|s| !is_missing_marker(s, markers)).map(|s| s.trim().to_string()))
                .collect();
            Ok(Series::new(series.name().clone(), values))
        }
        (SemanticType::Integer, dt) if is_integer_dtype(dt) => Ok(series.cast(&DataType::Int64)?),
        (SemanticType::Integer, dt) if is_numeric_dtype(dt) => {
            let values = f64_values(series)?;
            for (row, value) in values.iter().enumerate() {
                if let Some(v) = value
                    && v.fract() != 0.0
                {
                    return Err(coercion_error(series, row, &v.to_string(), semantic));
                }
            }
            Ok(series.cast(&DataType::Int64)?)
        }
        (SemanticType::Real, dt) if is_numeric_dtype(dt) => Ok(series.cast(&DataType::Float64)?),
        (SemanticType::Timestamp, DataType::Datetime(_, _) | DataType::Date) => {
            Ok(series.cast(&semantic.dtype())?)
        }
        (SemanticType::Categorical, _) => Ok(series.cast(&DataType::String)?),
        _ => {
            let first = string_values(series)?
                .into_iter()
                .enumerate()
                .find_map(|(row, v)| v.map(|v| (row, v)));
            let (row, value) = first.unwrap_or((0, format!("{:?}", dtype)));
            Err(coercion_error(series, row, &value, semantic))
        }
    }
}

/// Parse every non-missing cell of a string series with `parse`.
fn parse_text<T, F>(
    series: &Series,
    markers: &[String],
    semantic: SemanticType,
    parse: F,
) -> Result<Vec<Option<T>>>
where
    F: Fn(&str) -> Option<T>,
{
    let raw = series.str()?;
    let mut out = Vec::with_capacity(raw.len());

    for (row, cell) in raw.into_iter().enumerate() {
        match cell {
            None => out.push(None),
            Some(text) if is_missing_marker(text, markers) => out.push(None),
            Some(text) => match parse(text.trim()) {
                Some(v) => out.push(Some(v)),
                None => return Err(coercion_error(series, row, text, semantic)),
            },
        }
    }

    Ok(out)
}

fn coercion_error(series: &Series, row: usize, value: &str, semantic: SemanticType) -> PipelineError {
    PipelineError::TypeCoercion {
        column: series.name().to_string(),
        row,
        value: value.to_string(),
        target: semantic.label().to_string(),
    }
}

/// Parse a timestamp into epoch milliseconds (naive, no time zone).
pub fn parse_timestamp_millis(text: &str) -> Option<f64> {
    let text = text.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_millis() as f64);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis() as f64)
}
