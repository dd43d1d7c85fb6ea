//! Shared utilities for the preparation pipeline.
//!
//! Small helpers for moving data between polars columns and plain vectors,
//! plus the string parsing rules used by typed coercion.

use crate::error::{PipelineError, Result};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Markers treated as missing when no other configuration is given.
pub const DEFAULT_MISSING_MARKERS: [&str; 1] = ["NA"];

/// A number written with a single decimal comma and no decimal point.
static DECIMAL_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d*,\d+$").expect("Invalid regex: decimal comma"));

/// Check if a raw cell is empty or one of the configured missing markers.
pub fn is_missing_marker(raw: &str, markers: &[String]) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || markers.iter().any(|m| m == trimmed)
}

/// Replace a decimal comma with a decimal point.
///
/// Only values with exactly one comma and no point are rewritten, so
/// `"1012,5"` becomes `"1012.5"` while `"1,012.5"` is left alone.
pub fn normalize_decimal_separator(s: &str) -> Cow<'_, str> {
    let trimmed = s.trim();
    if DECIMAL_COMMA.is_match(trimmed) {
        Cow::Owned(trimmed.replacen(',', ".", 1))
    } else {
        Cow::Borrowed(trimmed)
    }
}

/// Parse a real number, accepting a decimal comma.
pub fn parse_real(s: &str) -> Option<f64> {
    let normalized = normalize_decimal_separator(s);
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer, accepting integral reals such as `"600.0"`.
pub fn parse_integer(s: &str) -> Option<i64> {
    let normalized = normalize_decimal_separator(s);
    if let Ok(v) = normalized.parse::<i64>() {
        return Some(v);
    }
    let v = parse_real(&normalized)?;
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

// =============================================================================
// Column Access Utilities
// =============================================================================

/// Names of all columns of a frame, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Fail with `UnknownColumn` unless every name exists in the frame.
pub fn require_columns<'a>(
    df: &DataFrame,
    table: &str,
    columns: impl IntoIterator<Item = &'a String>,
) -> Result<()> {
    let present = column_names(df);
    for column in columns {
        if !present.contains(column) {
            return Err(PipelineError::unknown_column(table, column.as_str()));
        }
    }
    Ok(())
}

/// Materialize a column as a series.
pub fn series_of<'a>(df: &'a DataFrame, table: &str, column: &str) -> Result<&'a Series> {
    df.column(column)
        .map(|c| c.as_materialized_series())
        .map_err(|_| PipelineError::unknown_column(table, column))
}

/// Values of a numeric column as `f64`, nulls preserved.
pub fn f64_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Values of an integer-like column as `i64`, nulls preserved.
pub fn i64_values(series: &Series) -> Result<Vec<Option<i64>>> {
    let cast = series.cast(&DataType::Int64)?;
    Ok(cast.i64()?.into_iter().collect())
}

/// Values of a column rendered as strings, nulls preserved.
pub fn string_values(series: &Series) -> Result<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Per-row null flags of a series.
pub fn null_flags(series: &Series) -> Vec<bool> {
    series
        .is_null()
        .into_iter()
        .map(|v| v.unwrap_or(false))
        .collect()
}

/// Build a filter mask from plain booleans.
pub fn mask_from(values: &[bool]) -> BooleanChunked {
    BooleanChunked::from_slice("mask".into(), values)
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Most frequent non-null value of a string column.
///
/// Ties are broken by first occurrence in row order, so the result only
/// depends on the values and their order, never on hash iteration order.
pub fn string_mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in values.iter().flatten().enumerate() {
        counts
            .entry(value.as_str())
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    counts
        .into_iter()
        .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then(fb.cmp(fa)))
        .map(|(value, _)| value.to_string())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
///
/// Integer series stay integer; the fill value is rounded half away from
/// zero in that case.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    if is_integer_dtype(series.dtype()) {
        let fill = fill_value.round() as i64;
        let cast = series.cast(&DataType::Int64)?;
        let filled: Vec<Option<i64>> = cast
            .i64()?
            .into_iter()
            .map(|v| Some(v.unwrap_or(fill)))
            .collect();
        return Ok(Series::new(series.name().clone(), filled));
    }

    let cast = series.cast(&DataType::Float64)?;
    let filled: Vec<Option<f64>> = cast
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let cast = series.cast(&DataType::String)?;
    let filled: Vec<Option<String>> = cast
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value).to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Tests
// =============================================================================
