use crate::error::Result;
use crate::utils::f64_values;
use polars::prelude::*;

/// Binary indicator: `1` where `value >= at`, `0` otherwise, null for null.
pub fn threshold_indicator(series: &Series, at: f64, target: &str) -> Result<Series> {
    let flags: Vec<Option<i64>> = f64_values(series)?
        .into_iter()
        .map(|v| v.map(|v| i64::from(v >= at)))
        .collect();
    Ok(Series::new(target.into(), flags))
}
