//! Data quality diagnostics.
//!
//! This module provides the missing-value analysis that is run before and
//! after every cleaning pass.

mod missingness;

pub use missingness::{MissingnessAnalyzer, MissingnessViolation};
