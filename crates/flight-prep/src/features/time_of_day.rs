//! Time-of-day buckets for HHMM clock codes.

use crate::error::{PipelineError, Result};
use crate::utils::i64_values;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Part of the day a scheduled time falls in.
///
/// Buckets are half-open: `[0000, 0600)` Night, `[0600, 1200)` Morning,
/// `[1200, 1800)` Afternoon, `[1800, 2400)` Evening. `2400` is midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Night => "Night",
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Evening => "Evening",
        }
    }

    /// Bucket an HHMM code, or `None` if it lies outside `[0, 2400]`.
    ///
    /// Buckets are plain half-open ranges over the integer code; 2400 is
    /// midnight.
    pub fn from_hhmm(hhmm: i64) -> Option<Self> {
        if !(0..=2400).contains(&hhmm) {
            return None;
        }
        let bucket = match hhmm % 2400 {
            0..600 => Self::Night,
            600..1200 => Self::Morning,
            1200..1800 => Self::Afternoon,
            _ => Self::Evening,
        };
        Some(bucket)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bucket every value of an HHMM series into a [`TimeOfDay`] label series.
pub fn bucket_series(series: &Series, target: &str) -> Result<Series> {
    let values = i64_values(series)?;
    let mut labels: Vec<Option<&'static str>> = Vec::with_capacity(values.len());

    for (row, value) in values.into_iter().enumerate() {
        match value {
            None => labels.push(None),
            Some(v) => match TimeOfDay::from_hhmm(v) {
                Some(bucket) => labels.push(Some(bucket.label())),
                None => {
                    return Err(PipelineError::InvalidValue {
                        column: series.name().to_string(),
                        row,
                        value: v.to_string(),
                        reason: "HHMM code outside [0, 2400]".to_string(),
                    });
                }
            },
        }
    }

    Ok(Series::new(target.into(), labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(TimeOfDay::from_hhmm(600), Some(TimeOfDay::Morning));
        assert_eq!(TimeOfDay::from_hhmm(599), Some(TimeOfDay::Night));
        assert_eq!(TimeOfDay::from_hhmm(1159), Some(TimeOfDay::Morning));
        assert_eq!(TimeOfDay::from_hhmm(1200), Some(TimeOfDay::Afternoon));
        assert_eq!(TimeOfDay::from_hhmm(1759), Some(TimeOfDay::Afternoon));
        assert_eq!(TimeOfDay::from_hhmm(1799), Some(TimeOfDay::Afternoon));
        assert_eq!(TimeOfDay::from_hhmm(1800), Some(TimeOfDay::Evening));
        assert_eq!(TimeOfDay::from_hhmm(2359), Some(TimeOfDay::Evening));
    }

    #[test]
    fn test_midnight_and_invalid_codes() {
        assert_eq!(TimeOfDay::from_hhmm(0), Some(TimeOfDay::Night));
        assert_eq!(TimeOfDay::from_hhmm(2400), Some(TimeOfDay::Night));
        assert_eq!(TimeOfDay::from_hhmm(2401), None);
        assert_eq!(TimeOfDay::from_hhmm(-1), None);
    }

    #[test]
    fn test_range_edges_are_not_rejected() {
        let s = Series::new("sched_dep_time".into(), &[599i64, 600, 1799, 2400]);
        let out = bucket_series(&s, "dep_period").unwrap();
        let labels: Vec<_> = out.str().unwrap().into_iter().flatten().collect();
        assert_eq!(labels, vec!["Night", "Morning", "Afternoon", "Night"]);
    }

    #[test]
    fn test_bucket_series() {
        let s = Series::new("sched_dep_time".into(), &[Some(515i64), None, Some(1800)]);
        let out = bucket_series(&s, "dep_period").unwrap();
        let labels = out.str().unwrap();
        assert_eq!(out.name().as_str(), "dep_period");
        assert_eq!(labels.get(0), Some("Night"));
        assert_eq!(labels.get(1), None);
        assert_eq!(labels.get(2), Some("Evening"));
    }

    #[test]
    fn test_bucket_series_rejects_invalid_code() {
        let s = Series::new("sched_dep_time".into(), &[600i64, 2500]);
        let err = bucket_series(&s, "dep_period").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidValue { row: 1, .. }));
    }
}
