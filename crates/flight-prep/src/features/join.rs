//! Left lookup join with first-match semantics.

use crate::error::{PipelineError, Result};
use crate::types::PipelineWarning;
use crate::utils::{
    column_names, f64_values, i64_values, is_integer_dtype, is_numeric_dtype, series_of,
    string_values,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// One equality condition of a join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinKey {
    pub left: String,
    pub right: String,
    /// Compare timestamps at hour resolution.
    #[serde(default)]
    pub truncate_to_hour: bool,
}

impl JoinKey {
    pub fn same(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            left: column.clone(),
            right: column,
            truncate_to_hour: false,
        }
    }

    pub fn hourly(column: impl Into<String>) -> Self {
        Self {
            truncate_to_hour: true,
            ..Self::same(column)
        }
    }
}

/// Which right-hand columns are looked up, and on which keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub right_table: String,
    pub keys: Vec<JoinKey>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct JoinOutput {
    pub frame: DataFrame,
    pub unmatched_rows: usize,
    pub warning: Option<PipelineWarning>,
}

type Key = Vec<String>;

/// Render the composite key of every row; `None` if any part is null.
fn row_keys(df: &DataFrame, table: &str, keys: &[JoinKey], left: bool) -> Result<Vec<Option<Key>>> {
    let mut out: Vec<Option<Key>> = vec![Some(Vec::with_capacity(keys.len())); df.height()];

    for key in keys {
        let name = if left { &key.left } else { &key.right };
        let series = series_of(df, table, name)?;

        let parts: Vec<Option<String>> = if key.truncate_to_hour {
            i64_values(series)?
                .into_iter()
                .map(|v| v.map(|ms| (ms.div_euclid(MILLIS_PER_HOUR) * MILLIS_PER_HOUR).to_string()))
                .collect()
        } else {
            string_values(series)?
        };

        for (slot, part) in out.iter_mut().zip(parts) {
            match (slot.as_mut(), part) {
                (Some(k), Some(p)) => k.push(p),
                _ => *slot = None,
            }
        }
    }

    Ok(out)
}

/// Append `spec.columns` of `right` to `left`, matching rows on `spec.keys`.
///
/// Every left row is kept in order. Left rows without a match get nulls.
/// When the right table repeats a key, the first row in table order wins
/// and a [`PipelineWarning::JoinCardinality`] is returned.
pub fn lookup_join(left: &DataFrame, left_table: &str, right: &DataFrame, spec: &JoinSpec) -> Result<JoinOutput> {
    let existing = column_names(left);
    for column in &spec.columns {
        if existing.contains(column) {
            return Err(PipelineError::InvalidConfig(format!(
                "joined column '{}.{}' already exists in '{}'",
                spec.right_table, column, left_table
            )));
        }
        let dtype = series_of(right, &spec.right_table, column)?.dtype();
        if !is_numeric_dtype(dtype) {
            return Err(PipelineError::InvalidConfig(format!(
                "joined column '{}.{}' must be numeric, found {:?}",
                spec.right_table, column, dtype
            )));
        }
    }

    // first row of each right-hand key
    let mut index: HashMap<Key, usize> = HashMap::new();
    let mut ignored_rows = 0usize;
    let mut repeated: HashSet<Key> = HashSet::new();
    for (row, key) in row_keys(right, &spec.right_table, &spec.keys, false)?
        .into_iter()
        .enumerate()
    {
        let Some(key) = key else { continue };
        if index.contains_key(&key) {
            ignored_rows += 1;
            repeated.insert(key);
        } else {
            index.insert(key, row);
        }
    }

    let matches: Vec<Option<usize>> = row_keys(left, left_table, &spec.keys, true)?
        .into_iter()
        .map(|key| key.and_then(|k| index.get(&k).copied()))
        .collect();
    let unmatched_rows = matches.iter().filter(|m| m.is_none()).count();

    let mut frame = left.clone();
    for column in &spec.columns {
        let source = series_of(right, &spec.right_table, column)?;
        let gathered = if is_integer_dtype(source.dtype()) {
            let values = i64_values(source)?;
            let picked: Vec<Option<i64>> = matches.iter().map(|m| m.and_then(|i| values[i])).collect();
            Series::new(column.as_str().into(), picked)
        } else {
            let values = f64_values(source)?;
            let picked: Vec<Option<f64>> = matches.iter().map(|m| m.and_then(|i| values[i])).collect();
            Series::new(column.as_str().into(), picked)
        };
        frame.with_column(gathered)?;
    }

    debug!(
        "Joined {} columns of '{}' onto '{}': {} of {} rows unmatched",
        spec.columns.len(),
        spec.right_table,
        left_table,
        unmatched_rows,
        left.height()
    );

    let warning = if repeated.is_empty() {
        None
    } else {
        let warning = PipelineWarning::JoinCardinality {
            right_table: spec.right_table.clone(),
            duplicate_keys: repeated.len(),
            ignored_rows,
        };
        warn!("{}", warning.message());
        Some(warning)
    };

    Ok(JoinOutput {
        frame,
        unmatched_rows,
        warning,
    })
}
