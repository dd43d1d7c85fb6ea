use super::PipelineReport;
use crate::config::{ExportFormat, PipelineConfig};
use crate::error::{Result, ResultExt};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_FILE: &str = "report.json";

/// Writes tables and the run report into the output directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    format: ExportFormat,
    separator: u8,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>, format: ExportFormat, separator: u8) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
            separator,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.output_dir.clone(), config.export_format, config.separator)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `df` as `<output_dir>/<name>.<ext>`.
    pub fn write_table(&self, name: &str, df: &DataFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self
            .output_dir
            .join(format!("{}.{}", name, self.format.extension()));
        let mut file = File::create(&path)?;
        let mut df = df.clone();

        match self.format {
            ExportFormat::Csv => CsvWriter::new(&mut file)
                .include_header(true)
                .with_separator(self.separator)
                .with_quote_char(b'"')
                .finish(&mut df)
                .context(format!("Failed to write '{}'", path.display()))?,
            ExportFormat::Parquet => {
                ParquetWriter::new(&mut file)
                    .finish(&mut df)
                    .context(format!("Failed to write '{}'", path.display()))?;
            }
        }

        info!("Table saved: {} ({} rows)", path.display(), df.height());
        Ok(path)
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_report(&self, report: &PipelineReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.output_dir.join(REPORT_FILE);
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn frame() -> DataFrame {
        df![
            "carrier_group" => ["UA", "Other"],
            "late" => [0i64, 1],
            "temp" => [0.25, 1.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_write_csv_uses_separator() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path(), ExportFormat::Csv, b';');

        let path = exporter.write_table("classification_train", &frame()).unwrap();

        assert_eq!(path.file_name().unwrap(), "classification_train.csv");
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("carrier_group;late;temp"));
        assert_eq!(lines.next(), Some("UA;0;0.25"));
    }

    #[test]
    fn test_write_parquet_round_trip() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path().join("nested"), ExportFormat::Parquet, b';');

        let path = exporter.write_table("features", &frame()).unwrap();

        let file = File::open(&path).unwrap();
        let back = ParquetReader::new(file).finish().unwrap();
        assert!(back.equals_missing(&frame()));
    }
}
