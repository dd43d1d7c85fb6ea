//! Run reports and file export.
//!
//! A [`PipelineReport`] records what every stage did. It is returned to
//! library callers, printed with `--json`, and written as `report.json`
//! by the [`Exporter`] next to the exported splits.

mod exporter;
mod report;

pub use exporter::{Exporter, REPORT_FILE};
pub use report::{InspectionReport, PipelineReport, RunSettings, SplitSummary, TableOverview};
pub(crate) use report::timestamp;
