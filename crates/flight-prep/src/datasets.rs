//! Schemas and default treatment of the five flight tables.

use crate::cleaner::{CleaningRule, DropCriterion, ImputeStrategy, ThresholdComparison};
use crate::features::{FeaturePlan, FeatureSpec, FeatureTransform, JoinKey, JoinSpec, OTHER_LEVEL};
use crate::split::Stratification;
use crate::types::{SemanticType, TableKind, TableSchema};
use serde::{Deserialize, Serialize};

use SemanticType::{Categorical, Integer, Real, Timestamp};

/// Carriers kept as their own level; the rest become [`OTHER_LEVEL`].
pub const DEFAULT_CARRIER_KEEP: [&str; 6] = ["AA", "B6", "DL", "EV", "UA", "US"];

/// Weather measurements looked up for every flight.
pub const WEATHER_MEASUREMENTS: [&str; 9] = [
    "temp",
    "dewp",
    "humid",
    "wind_dir",
    "wind_speed",
    "wind_gust",
    "precip",
    "pressure",
    "visib",
];

/// Joined measurements a feature row cannot do without.
pub const REQUIRED_WEATHER: [&str; 5] = ["temp", "humid", "wind_speed", "precip", "visib"];

/// Columns scaled into `[0, 1]`.
pub const MIN_MAX_COLUMNS: [&str; 8] = [
    "dep_delay",
    "distance",
    "air_time",
    "temp",
    "humid",
    "wind_speed",
    "precip",
    "visib",
];

pub const LATE_COLUMN: &str = "late";
pub const DELAY_COLUMN: &str = "arr_delay";

/// Declared columns of a table.
pub fn schema(kind: TableKind) -> TableSchema {
    let schema = TableSchema::new(kind.name());
    match kind {
        TableKind::Airlines => schema.column("carrier", Categorical).column("name", Categorical),
        TableKind::Airports => schema
            .column("faa", Categorical)
            .column("name", Categorical)
            .column("lat", Real)
            .column("lon", Real)
            .column("alt", Integer)
            .column("tz", Integer)
            .column("dst", Categorical)
            .column("tzone", Categorical),
        TableKind::Flights => schema
            .column("year", Integer)
            .column("month", Integer)
            .column("day", Integer)
            .column("dep_time", Integer)
            .column("sched_dep_time", Integer)
            .column("dep_delay", Real)
            .column("arr_time", Integer)
            .column("sched_arr_time", Integer)
            .column("arr_delay", Real)
            .column("carrier", Categorical)
            .column("flight", Integer)
            .column("tailnum", Categorical)
            .column("origin", Categorical)
            .column("dest", Categorical)
            .column("air_time", Real)
            .column("distance", Real)
            .column("hour", Integer)
            .column("minute", Integer)
            .column("time_hour", Timestamp),
        TableKind::Planes => schema
            .column("tailnum", Categorical)
            .column("year", Integer)
            .column("type", Categorical)
            .column("manufacturer", Categorical)
            .column("model", Categorical)
            .column("engines", Integer)
            .column("seats", Integer)
            .column("speed", Real)
            .column("engine", Categorical),
        TableKind::Weather => schema
            .column("origin", Categorical)
            .column("year", Integer)
            .column("month", Integer)
            .column("day", Integer)
            .column("hour", Integer)
            .column("temp", Real)
            .column("dewp", Real)
            .column("humid", Real)
            .column("wind_dir", Real)
            .column("wind_speed", Real)
            .column("wind_gust", Real)
            .column("precip", Real)
            .column("pressure", Real)
            .column("visib", Real)
            .column("time_hour", Timestamp),
    }
}

fn impute_all(mut rule: CleaningRule, columns: &[&str], strategy: ImputeStrategy) -> CleaningRule {
    for column in columns {
        rule = rule.impute(*column, strategy.clone());
    }
    rule
}

/// Default cleaning rule of a table.
///
/// `drop_threshold` and `comparison` only affect the weather rule.
pub fn default_rule(kind: TableKind, drop_threshold: f64, comparison: ThresholdComparison) -> CleaningRule {
    let rule = CleaningRule::new(kind.name());
    match kind {
        TableKind::Flights => {
            let rule = rule.drop_when(DropCriterion::all_missing(["dep_time", "arr_time"]));
            let rule = impute_all(
                rule,
                &["dep_time", "dep_delay", "arr_time", "arr_delay", "air_time"],
                ImputeStrategy::Median,
            );
            rule.impute("tailnum", ImputeStrategy::text("unknown"))
        }
        TableKind::Weather => {
            let rule = rule.drop_when(DropCriterion::fraction_missing(
                WEATHER_MEASUREMENTS,
                drop_threshold,
                comparison,
            ));
            let rule = impute_all(
                rule,
                &["temp", "dewp", "humid", "wind_speed", "wind_gust"],
                ImputeStrategy::Mean,
            );
            let rule = impute_all(rule, &["wind_dir", "pressure", "visib"], ImputeStrategy::Median);
            rule.impute("precip", ImputeStrategy::number(0.0))
        }
        TableKind::Airlines => rule
            .drop_when(DropCriterion::any_missing(["carrier"]))
            .impute("name", ImputeStrategy::text("unknown")),
        TableKind::Airports => {
            let rule = rule.drop_when(DropCriterion::any_missing(["faa"]));
            let rule = impute_all(rule, &["lat", "lon", "alt", "tz"], ImputeStrategy::Median);
            let rule = rule.impute("dst", ImputeStrategy::Mode);
            impute_all(rule, &["name", "tzone"], ImputeStrategy::text("unknown"))
        }
        TableKind::Planes => {
            let rule = rule.drop_when(DropCriterion::any_missing(["tailnum"]));
            let rule = impute_all(rule, &["year", "engines", "seats", "speed"], ImputeStrategy::Median);
            impute_all(
                rule,
                &["type", "manufacturer", "model", "engine"],
                ImputeStrategy::Mode,
            )
        }
    }
}

/// Default feature plan: weather lookup, derived features, scaling.
pub fn default_feature_plan(carrier_keep: &[String], late_threshold: f64) -> FeaturePlan {
    let mut features = vec![
        FeatureSpec::new("sched_dep_time", FeatureTransform::TimeOfDay, "dep_period"),
        FeatureSpec::new(
            "carrier",
            FeatureTransform::Collapse {
                keep: carrier_keep.to_vec(),
                other: OTHER_LEVEL.to_string(),
            },
            "carrier_group",
        ),
        FeatureSpec::new(DELAY_COLUMN, FeatureTransform::Threshold { at: late_threshold }, LATE_COLUMN),
    ];
    features.extend(MIN_MAX_COLUMNS.iter().map(|c| FeatureSpec::min_max(*c)));

    FeaturePlan {
        join: JoinSpec {
            right_table: TableKind::Weather.name().to_string(),
            keys: vec![JoinKey::same("origin"), JoinKey::hourly("time_hour")],
            columns: WEATHER_MEASUREMENTS.iter().map(|c| c.to_string()).collect(),
        },
        required: REQUIRED_WEATHER.iter().map(|c| c.to_string()).collect(),
        features,
    }
}

/// A named prediction task the feature table is split for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTask {
    pub name: String,
    pub target: String,
    pub stratify: Stratification,
}

/// The regression task on `arr_delay` and the classification task on `late`.
pub fn default_tasks(regression_bins: usize) -> Vec<SplitTask> {
    vec![
        SplitTask {
            name: "regression".to_string(),
            target: DELAY_COLUMN.to_string(),
            stratify: Stratification::QuantileBins(regression_bins),
        },
        SplitTask {
            name: "classification".to_string(),
            target: LATE_COLUMN.to_string(),
            stratify: Stratification::Levels,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_only_reference_declared_columns() {
        for kind in TableKind::ALL {
            let schema = schema(kind);
            let rule = default_rule(kind, 0.5, ThresholdComparison::GreaterThan);
            rule.validate().unwrap();
            for column in rule.referenced_columns() {
                assert!(
                    schema.get(column).is_some(),
                    "{} rule references undeclared column {}",
                    kind,
                    column
                );
            }
        }
    }

    #[test]
    fn test_rule_strategies_fit_column_types() {
        for kind in TableKind::ALL {
            let schema = schema(kind);
            let rule = default_rule(kind, 0.5, ThresholdComparison::GreaterThan);
            for imputation in &rule.impute {
                let semantic = schema.get(&imputation.column).unwrap();
                let numeric_strategy = matches!(
                    imputation.strategy,
                    ImputeStrategy::Median
                        | ImputeStrategy::Mean
                        | ImputeStrategy::Constant(crate::cleaner::FillValue::Number(_))
                );
                assert_eq!(numeric_strategy, semantic.is_numeric(), "{}.{}", kind, imputation.column);
            }
        }
    }

    #[test]
    fn test_default_plan_joins_every_required_column() {
        let keep: Vec<String> = DEFAULT_CARRIER_KEEP.iter().map(|s| s.to_string()).collect();
        let plan = default_feature_plan(&keep, 15.0);
        for column in &plan.required {
            assert!(plan.join.columns.contains(column));
        }
        let weather = schema(TableKind::Weather);
        for column in &plan.join.columns {
            assert!(weather.get(column).unwrap().is_numeric());
        }
        assert!(plan.features.iter().any(|f| f.target == LATE_COLUMN));
    }
}
