//! Min-max scaling.

use crate::error::{PipelineError, Result};
use crate::types::NormalizationParams;
use crate::utils::f64_values;
use polars::prelude::*;

/// Value every non-null entry maps to when a column has a single value.
pub const CONSTANT_RANGE_VALUE: f64 = 0.5;

impl NormalizationParams {
    /// Observed range of the non-null values of `series`.
    pub fn fit(series: &Series) -> Result<Self> {
        let values = f64_values(series)?;
        let mut range: Option<(f64, f64)> = None;
        for v in values.into_iter().flatten() {
            range = Some(match range {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            });
        }
        let (min, max) = range.ok_or_else(|| PipelineError::NoValidValues(series.name().to_string()))?;
        Ok(Self { min, max })
    }

    pub fn is_constant(&self) -> bool {
        self.max == self.min
    }

    pub fn normalize(&self, x: f64) -> f64 {
        normalize(x, self.min, self.max)
    }

    pub fn denormalize(&self, y: f64) -> f64 {
        denormalize(y, self.min, self.max)
    }
}

/// `(x - min) / (max - min)`; a constant range maps to
/// [`CONSTANT_RANGE_VALUE`].
pub fn normalize(x: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return CONSTANT_RANGE_VALUE;
    }
    if x == min {
        return 0.0;
    }
    if x == max {
        return 1.0;
    }
    (x - min) / (max - min)
}

/// Inverse of [`normalize`] for a non-constant range.
pub fn denormalize(y: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return min;
    }
    min + y * (max - min)
}

/// Scale a numeric series into `[0, 1]` using its own range.
pub fn min_max_series(series: &Series, target: &str) -> Result<(Series, NormalizationParams)> {
    let params = NormalizationParams::fit(series)?;
    let scaled: Vec<Option<f64>> = f64_values(series)?
        .into_iter()
        .map(|v| v.map(|x| params.normalize(x)))
        .collect();
    Ok((Series::new(target.into(), scaled), params))
}
