//! Seeded, stratified train/test partitioning.

use crate::error::{PipelineError, Result};
use crate::utils::{f64_values, mask_from, series_of, string_values};
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Stratum label of rows whose target is null.
const NULL_STRATUM: &str = "<null>";

/// How rows are grouped before sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "bins", rename_all = "snake_case")]
pub enum Stratification {
    /// One stratum per distinct target value.
    Levels,
    /// `k` equal-count bins of a numeric target.
    QuantileBins(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSpec {
    pub target: String,
    pub fraction: f64,
    pub seed: u64,
    pub stratify: Stratification,
}

/// A disjoint, exhaustive train/test partition of one frame.
#[derive(Debug, Clone)]
pub struct Split {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub train: DataFrame,
    pub test: DataFrame,
}

pub struct Splitter;

impl Splitter {
    pub fn split(df: &DataFrame, spec: &SplitSpec) -> Result<Split> {
        if !(spec.fraction > 0.0 && spec.fraction < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "train fraction {} must be strictly between 0 and 1",
                spec.fraction
            )));
        }
        if let Stratification::QuantileBins(0) = spec.stratify {
            return Err(PipelineError::InvalidConfig(
                "quantile stratification needs at least one bin".to_string(),
            ));
        }

        let target = series_of(df, "features", &spec.target)?;
        let labels = Self::strata(target, spec.stratify)?;

        let mut strata: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (row, label) in labels.into_iter().enumerate() {
            strata.entry(label).or_default().push(row);
        }

        let mut rng = StdRng::seed_from_u64(spec.seed);
        let mut in_train = vec![false; df.height()];
        for (label, mut rows) in strata {
            rows.shuffle(&mut rng);
            let take = (spec.fraction * rows.len() as f64).round() as usize;
            for &row in &rows[..take] {
                in_train[row] = true;
            }
            debug!("Stratum '{}': {} of {} rows to train", label, take, rows.len());
        }

        let train_indices: Vec<usize> = (0..df.height()).filter(|&i| in_train[i]).collect();
        let test_indices: Vec<usize> = (0..df.height()).filter(|&i| !in_train[i]).collect();
        let test_mask: Vec<bool> = in_train.iter().map(|t| !t).collect();

        let train = df.filter(&mask_from(&in_train))?;
        let test = df.filter(&mask_from(&test_mask))?;

        info!(
            "Split on '{}' (seed {}): {} train, {} test",
            spec.target,
            spec.seed,
            train.height(),
            test.height()
        );

        Ok(Split {
            train_indices,
            test_indices,
            train,
            test,
        })
    }

    /// Stratum label of every row.
    fn strata(target: &Series, stratify: Stratification) -> Result<Vec<String>> {
        match stratify {
            Stratification::Levels => Ok(string_values(target)?
                .into_iter()
                .map(|v| v.unwrap_or_else(|| NULL_STRATUM.to_string()))
                .collect()),
            Stratification::QuantileBins(k) => {
                let values = f64_values(target)?;
                let mut ranked: Vec<(usize, f64)> = values
                    .iter()
                    .enumerate()
                    .filter_map(|(row, v)| v.map(|v| (row, v)))
                    .collect();
                ranked.sort_by(|(ra, a), (rb, b)| a.total_cmp(b).then(ra.cmp(rb)));

                let n = ranked.len();
                let mut labels = vec![NULL_STRATUM.to_string(); values.len()];
                for (rank, (row, _)) in ranked.into_iter().enumerate() {
                    let bin = rank * k / n;
                    // zero-padded so lexicographic order matches bin order
                    labels[row] = format!("bin{:04}", bin);
                }
                Ok(labels)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame(n: usize) -> DataFrame {
        let delay: Vec<f64> = (0..n).map(|i| ((i * 37) % 101) as f64 - 20.0).collect();
        let late: Vec<i64> = delay.iter().map(|d| i64::from(*d >= 15.0)).collect();
        let carrier: Vec<&str> = (0..n).map(|i| ["AA", "UA", "OO", "9E"][i % 4]).collect();
        df![
            "arr_delay" => delay,
            "late" => late,
            "carrier" => carrier,
        ]
        .unwrap()
    }

    fn spec(target: &str, stratify: Stratification) -> SplitSpec {
        SplitSpec {
            target: target.to_string(),
            fraction: 0.8,
            seed: 11111,
            stratify,
        }
    }

    #[test]
    fn test_split_is_reproducible() {
        let df = frame(200);
        let a = Splitter::split(&df, &spec("arr_delay", Stratification::QuantileBins(5))).unwrap();
        let b = Splitter::split(&df, &spec("arr_delay", Stratification::QuantileBins(5))).unwrap();
        assert_eq!(a.train_indices, b.train_indices);
        assert_eq!(a.test_indices, b.test_indices);
        assert!(a.train.equals_missing(&b.train));
    }

    #[test]
    fn test_split_is_disjoint_and_exhaustive() {
        let df = frame(137);
        let split = Splitter::split(&df, &spec("late", Stratification::Levels)).unwrap();

        let mut all: Vec<usize> = split.train_indices.iter().chain(&split.test_indices).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..137).collect::<Vec<_>>());
        assert_eq!(split.train.height() + split.test.height(), 137);
        assert!(split.train_indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_split_preserves_stratum_proportions() {
        let df = frame(500);
        let split = Splitter::split(&df, &spec("late", Stratification::Levels)).unwrap();

        let share = |frame: &DataFrame| {
            let late = frame.column("late").unwrap().i64().unwrap();
            late.into_iter().flatten().sum::<i64>() as f64 / frame.height() as f64
        };
        assert!((share(&split.train) - share(&df)).abs() < 0.01);
        assert!((share(&split.test) - share(&df)).abs() < 0.02);
        assert_eq!(split.train.height(), 400);
    }

    #[test]
    fn test_split_unaffected_by_recoding_other_columns() {
        let df = frame(120);
        let mut recoded = df.clone();
        recoded
            .replace(
                "carrier",
                Series::new("carrier".into(), vec!["Other"; 120]),
            )
            .unwrap();

        let a = Splitter::split(&df, &spec("late", Stratification::Levels)).unwrap();
        let b = Splitter::split(&recoded, &spec("late", Stratification::Levels)).unwrap();
        assert_eq!(a.train_indices, b.train_indices);
    }

    #[test]
    fn test_different_seed_changes_partition() {
        let df = frame(200);
        let a = Splitter::split(&df, &spec("late", Stratification::Levels)).unwrap();
        let mut other = spec("late", Stratification::Levels);
        other.seed = 22222;
        let b = Splitter::split(&df, &other).unwrap();
        assert_ne!(a.train_indices, b.train_indices);
    }

    #[test]
    fn test_nulls_form_their_own_stratum() {
        let df = df!["y" => [Some(1.0), None, Some(2.0), None, Some(3.0)]].unwrap();
        let labels = Splitter::strata(df.column("y").unwrap().as_materialized_series(), Stratification::QuantileBins(2)).unwrap();
        assert_eq!(labels[1], NULL_STRATUM);
        assert_eq!(labels[3], NULL_STRATUM);
        assert_eq!(labels[0], "bin0000");
        assert_eq!(labels[4], "bin0001");
    }

    #[test]
    fn test_invalid_fraction() {
        let df = frame(10);
        for fraction in [0.0, 1.0, -0.5, f64::NAN] {
            let mut s = spec("late", Stratification::Levels);
            s.fraction = fraction;
            assert!(matches!(Splitter::split(&df, &s), Err(PipelineError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_unknown_target() {
        let df = frame(10);
        let err = Splitter::split(&df, &spec("dep_delay", Stratification::Levels)).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownColumn { .. }));
    }
}
