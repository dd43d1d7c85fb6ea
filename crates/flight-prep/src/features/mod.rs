//! Feature construction.
//!
//! A [`FeaturePlan`] describes the weather lookup, the columns that must be
//! present after it, and an ordered list of [`FeatureSpec`]s. Each spec reads
//! one source column and writes one target column; later specs see the
//! output of earlier ones.

mod collapse;
mod indicator;
mod join;
mod normalize;
mod time_of_day;

pub use collapse::{OTHER_LEVEL, collapse_levels};
pub use indicator::threshold_indicator;
pub use join::{JoinKey, JoinOutput, JoinSpec, lookup_join};
pub use normalize::{CONSTANT_RANGE_VALUE, denormalize, min_max_series, normalize};
pub use time_of_day::{TimeOfDay, bucket_series};

use crate::error::{PipelineError, Result};
use crate::types::{FeatureSummary, NormalizedColumn, PipelineWarning};
use crate::utils::{mask_from, null_flags, require_columns, series_of};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Derivation applied by a [`FeatureSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureTransform {
    /// HHMM clock code to a [`TimeOfDay`] label.
    TimeOfDay,
    /// Keep the listed levels, recode the rest to `other`.
    Collapse { keep: Vec<String>, other: String },
    /// `1` if the value is at least `at`, else `0`.
    Threshold { at: f64 },
    /// Min-max scaling over the whole frame.
    MinMax,
}

impl FeatureTransform {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TimeOfDay => "time_of_day",
            Self::Collapse { .. } => "collapse",
            Self::Threshold { .. } => "threshold",
            Self::MinMax => "min_max",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub sources: Vec<String>,
    pub transform: FeatureTransform,
    pub target: String,
}

impl FeatureSpec {
    pub fn new(source: impl Into<String>, transform: FeatureTransform, target: impl Into<String>) -> Self {
        Self {
            sources: vec![source.into()],
            transform,
            target: target.into(),
        }
    }

    /// Scale `column` in place.
    pub fn min_max(column: impl Into<String>) -> Self {
        let column = column.into();
        Self::new(column.clone(), FeatureTransform::MinMax, column)
    }

    fn source(&self) -> Result<&str> {
        match self.sources.as_slice() {
            [single] => Ok(single.as_str()),
            _ => Err(PipelineError::InvalidConfig(format!(
                "'{}' feature '{}' needs exactly one source column, got {}",
                self.transform.label(),
                self.target,
                self.sources.len()
            ))),
        }
    }
}

/// Everything the feature stage does, as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePlan {
    pub join: JoinSpec,
    /// Rows still missing any of these after the join are dropped.
    pub required: Vec<String>,
    pub features: Vec<FeatureSpec>,
}

/// Output of [`FeatureBuilder::build`].
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub frame: DataFrame,
    pub normalization: Vec<NormalizedColumn>,
    pub summary: FeatureSummary,
    pub warnings: Vec<PipelineWarning>,
}

/// Runs a [`FeaturePlan`] over the cleaned flights and weather tables.
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn build(flights: &DataFrame, weather: &DataFrame, plan: &FeaturePlan) -> Result<FeatureTable> {
        info!("Building features from {} flights...", flights.height());

        let joined = lookup_join(flights, "flights", weather, &plan.join)?;
        let warnings: Vec<PipelineWarning> = joined.warning.into_iter().collect();

        let filtered = Self::drop_incomplete(&joined.frame, &plan.required)?;
        let rows_dropped_post_join = joined.frame.height() - filtered.height();

        let (frame, normalization) = Self::derive(filtered, &plan.features)?;

        let summary = FeatureSummary {
            rows_in: flights.height(),
            unmatched_rows: joined.unmatched_rows,
            rows_dropped_post_join,
            rows_out: frame.height(),
            derived_columns: plan.features.iter().map(|f| f.target.clone()).collect(),
        };

        info!(
            "Features built: {} -> {} rows ({} without weather, {} dropped after join)",
            summary.rows_in, summary.rows_out, summary.unmatched_rows, summary.rows_dropped_post_join
        );

        Ok(FeatureTable {
            frame,
            normalization,
            summary,
            warnings,
        })
    }

    /// Drop rows missing any of `required`.
    pub fn drop_incomplete(df: &DataFrame, required: &[String]) -> Result<DataFrame> {
        require_columns(df, "features", required)?;
        if required.is_empty() {
            return Ok(df.clone());
        }

        let mut keep = vec![true; df.height()];
        for column in required {
            for (k, is_null) in keep.iter_mut().zip(null_flags(series_of(df, "features", column)?)) {
                *k &= !is_null;
            }
        }

        let out = df.filter(&mask_from(&keep))?;
        if out.height() == 0 {
            return Err(PipelineError::DataLoss {
                table: "features".to_string(),
                rows_before: df.height(),
            });
        }
        Ok(out)
    }

    /// Apply feature specs in order.
    pub fn derive(mut df: DataFrame, features: &[FeatureSpec]) -> Result<(DataFrame, Vec<NormalizedColumn>)> {
        let mut normalization = Vec::new();

        for spec in features {
            let source = series_of(&df, "features", spec.source()?)?;
            let derived = match &spec.transform {
                FeatureTransform::TimeOfDay => bucket_series(source, &spec.target)?,
                FeatureTransform::Collapse { keep, other } => {
                    collapse_levels(source, keep, other, &spec.target)?
                }
                FeatureTransform::Threshold { at } => threshold_indicator(source, *at, &spec.target)?,
                FeatureTransform::MinMax => {
                    let (scaled, params) = min_max_series(source, &spec.target)?;
                    normalization.push(NormalizedColumn {
                        column: spec.target.clone(),
                        params,
                    });
                    scaled
                }
            };

            debug!(
                "Derived '{}' from {:?} ({})",
                spec.target,
                spec.sources,
                spec.transform.label()
            );
            df.with_column(derived)?;
        }

        Ok((df, normalization))
    }
}
