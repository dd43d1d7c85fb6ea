//! Imputation module for handling missing values.
//!
//! Statistical imputation (mean, median, mode, constant) with statistics
//! computed once per column before any value is filled.

mod statistical;

pub use statistical::{ImputationPlan, Statistic, StatisticalImputer};
