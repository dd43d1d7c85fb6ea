//! CLI entry point for the flight data preparation pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use flight_prep::{
    ExportFormat, InspectionReport, Pipeline, PipelineConfig, PipelineConfigBuilder,
    PipelineOutput,
};
use std::path::PathBuf;
use tracing::{error, info};

/// CLI-compatible export format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliExportFormat {
    /// Separator-delimited text files
    Csv,
    /// Apache Parquet files
    Parquet,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(cli: CliExportFormat) -> Self {
        match cli {
            CliExportFormat::Csv => ExportFormat::Csv,
            CliExportFormat::Parquet => ExportFormat::Parquet,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Flight delay data preparation pipeline",
    long_about = "Cleans the NYC flights tables, joins hourly weather, derives features \
                  and writes seeded train/test splits for a regression and a \
                  classification task.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  FLIGHT_PREP_DATA_DIR  Directory holding the input tables\n  \
                  FLIGHT_PREP_CONFIG    JSON configuration file\n  \
                  RUST_LOG              Log filter, overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Run with defaults (reads ./data, writes ./output)\n  \
                  flight-prep\n\n  \
                  # Different seed and Parquet output\n  \
                  flight-prep --seed 42 --format parquet -o splits/\n\n  \
                  # Inspect missingness without cleaning\n  \
                  flight-prep --dry-run"
)]
struct Args {
    /// Directory holding airlines.csv, airports.csv, flights.csv, planes.csv and weather.csv
    #[arg(short, long, env = "FLIGHT_PREP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Output directory for splits and the report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file
    ///
    /// Command line flags override values from the file
    #[arg(short, long, env = "FLIGHT_PREP_CONFIG")]
    config: Option<PathBuf>,

    /// Seed of the train/test shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Share of every stratum that goes to the training set (0.0 - 1.0, exclusive)
    #[arg(long)]
    train_fraction: Option<f64>,

    /// Arrival delay in minutes at which a flight counts as late
    #[arg(long)]
    late_threshold: Option<f64>,

    /// Field separator of input and output files
    #[arg(long)]
    separator: Option<char>,

    /// Format of the exported splits
    #[arg(long, value_enum)]
    format: Option<CliExportFormat>,

    /// Run every stage but keep results in memory
    #[arg(long)]
    no_export: bool,

    /// Load the tables and report their missingness without cleaning
    #[arg(long)]
    dry_run: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Load environment variables from .env file before clap reads them
    dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;
    let pipeline = build_pipeline(&args, config)?;

    if args.dry_run {
        let inspection = pipeline
            .inspect()
            .map_err(|e| anyhow!("Inspection failed: {}", e))?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&inspection)?);
        } else {
            print_inspection(&inspection);
        }
        return Ok(());
    }

    info!("{}", "=".repeat(80));
    info!("Starting flight preparation pipeline...");
    info!("{}", "=".repeat(80));

    match pipeline.run() {
        Ok(output) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&output.report)?);
            } else {
                print_human_readable_summary(&output, pipeline.config());
            }
            Ok(())
        }
        Err(e) => {
            error!("Pipeline failed [{}]: {}", e.error_code(), e);
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

/// Start from the config file (or defaults) and apply command line overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            PipelineConfig::from_json_file(path)?
        }
        None => PipelineConfig::default(),
    };

    let mut builder = PipelineConfigBuilder::from_config(base);

    if let Some(ref dir) = args.data_dir {
        builder = builder.data_dir(dir);
    }
    if let Some(ref dir) = args.output {
        builder = builder.output_dir(dir);
    }
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    if let Some(fraction) = args.train_fraction {
        builder = builder.train_fraction(fraction);
    }
    if let Some(minutes) = args.late_threshold {
        builder = builder.late_threshold(minutes);
    }
    if let Some(separator) = args.separator
        && !separator.is_ascii()
    {
        return Err(anyhow!("Separator must be a single ASCII character, got '{}'", separator));
    }
    if let Some(separator) = args.separator {
        builder = builder.separator(separator as u8);
    }
    if let Some(format) = args.format {
        builder = builder.export_format(format.into());
    }
    if args.no_export {
        builder = builder.save_to_disk(false);
    }

    Ok(builder.build()?)
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Print the dry-run overview.
///
/// Note: This function uses `println!` intentionally for user-facing CLI output.
fn print_inspection(report: &InspectionReport) {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Loaded tables");
    println!("{}\n", "=".repeat(80));

    println!("{:<12} {:>10} {:>8} {:>12}", "Table", "Rows", "Columns", "Missing");
    println!("{}", "-".repeat(45));
    for table in &report.tables {
        println!(
            "{:<12} {:>10} {:>8} {:>12}",
            table.table,
            table.rows,
            table.columns,
            table.missing.total()
        );
    }
    println!();

    for table in report.tables.iter().filter(|t| !t.missing.is_clean()) {
        println!("MISSING VALUES: {}", table.table);
        println!("{}", "-".repeat(40));
        for column in &table.missing.columns {
            println!("  {:<20} {}", truncate_str(&column.column, 19), column.missing);
        }
        println!();
    }

    println!("{}", "=".repeat(80));
    println!("To clean and split, run without --dry-run");
    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Print a human-readable summary of a finished run.
fn print_human_readable_summary(output: &PipelineOutput, config: &PipelineConfig) {
    let report = &output.report;

    println!();
    println!("{}", "=".repeat(80));
    println!("PREPARATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Cleaning:");
    for table in &report.tables {
        let imputed: usize = table.imputed.iter().map(|c| c.filled).sum();
        println!(
            "  {:<10} {:>8} -> {:>8} rows ({} dropped, {} values imputed)",
            table.table,
            table.rows_before,
            table.rows_after,
            table.rows_dropped(),
            imputed
        );
    }
    println!();

    let features = &report.features;
    println!("Features:");
    println!(
        "  Rows: {} -> {} ({} without weather, {} dropped after join)",
        features.rows_in, features.rows_out, features.unmatched_rows, features.rows_dropped_post_join
    );
    println!("  Derived: {}", features.derived_columns.join(", "));
    println!();

    println!("Splits (seed {}):", report.settings.seed);
    for split in &report.splits {
        println!(
            "  {:<15} target {:<12} {} train / {} test",
            split.task, split.target, split.train_rows, split.test_rows
        );
    }
    println!();

    if !report.warnings.is_empty() {
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  - {}", warning.message());
        }
        println!();
    }

    if config.save_to_disk {
        println!("Output Files:");
        for file in &report.output_files {
            println!("  - {}", file);
        }
    } else {
        println!("Export disabled; results kept in memory");
    }

    println!();
    println!("Duration: {}ms", report.duration_ms);
    println!("{}", "=".repeat(80));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["flight-prep"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&["--seed", "42", "--separator", ",", "--format", "parquet", "--no-export"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.separator, b',');
        assert_eq!(config.export_format, ExportFormat::Parquet);
        assert!(!config.save_to_disk);
    }

    #[test]
    fn test_non_ascii_separator_is_rejected() {
        let args = parse(&["--separator", "§"]);
        let err = build_config(&args).unwrap_err();
        assert!(err.to_string().contains("ASCII"));
    }

    #[test]
    fn test_invalid_fraction_is_rejected() {
        let args = parse(&["--train-fraction", "1.5"]);
        assert!(build_config(&args).is_err());
    }
}
