use crate::error::Result;
use crate::utils::string_values;
use polars::prelude::*;

/// Default label for levels outside the keep-list.
pub const OTHER_LEVEL: &str = "Other";

/// Retain the levels in `keep` and recode every other non-null level to
/// `other`. Nulls stay null.
pub fn collapse_levels(series: &Series, keep: &[String], other: &str, target: &str) -> Result<Series> {
    let values: Vec<Option<String>> = string_values(series)?
        .into_iter()
        .map(|v| {
            v.map(|level| {
                if keep.contains(&level) {
                    level
                } else {
                    other.to_string()
                }
            })
        })
        .collect();

    Ok(Series::new(target.into(), values))
}
