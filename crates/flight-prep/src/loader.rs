//! Reading the five source tables.

use crate::cleaner::coerce_schema;
use crate::config::PipelineConfig;
use crate::datasets;
use crate::error::{PipelineError, Result, ResultExt};
use crate::types::TableKind;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The five tables of one run, before cleaning.
#[derive(Debug, Clone)]
pub struct RawTables {
    pub airlines: DataFrame,
    pub airports: DataFrame,
    pub flights: DataFrame,
    pub planes: DataFrame,
    pub weather: DataFrame,
}

impl RawTables {
    pub fn get(&self, kind: TableKind) -> &DataFrame {
        match kind {
            TableKind::Airlines => &self.airlines,
            TableKind::Airports => &self.airports,
            TableKind::Flights => &self.flights,
            TableKind::Planes => &self.planes,
            TableKind::Weather => &self.weather,
        }
    }
}

/// Reads `<data_dir>/<table>.csv` files and types them.
#[derive(Debug, Clone)]
pub struct Loader {
    data_dir: PathBuf,
    separator: u8,
    markers: Vec<String>,
}

impl Loader {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            separator: config.separator,
            markers: config.missing_markers.clone(),
        }
    }

    pub fn path_of(&self, kind: TableKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    /// Read a table with every column as text.
    pub fn read_text(&self, kind: TableKind) -> Result<DataFrame> {
        let path = self.path_of(kind);
        read_text_csv(&path, self.separator).context(format!("Failed to load '{}'", path.display()))
    }

    /// Read a table and convert its declared columns to their types.
    pub fn load(&self, kind: TableKind) -> Result<DataFrame> {
        let raw = self.read_text(kind)?;
        let typed = coerce_schema(&raw, &datasets::schema(kind), &self.markers)?;
        info!("Loaded '{}': {} rows x {} columns", kind, typed.height(), typed.width());
        Ok(typed)
    }

    pub fn load_all(&self) -> Result<RawTables> {
        Ok(RawTables {
            airlines: self.load(TableKind::Airlines)?,
            airports: self.load(TableKind::Airports)?,
            flights: self.load(TableKind::Flights)?,
            planes: self.load(TableKind::Planes)?,
            weather: self.load(TableKind::Weather)?,
        })
    }
}

fn read_text_csv(path: &Path, separator: u8) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("'{}' does not exist", path.display()),
        )));
    }

    debug!("Reading {}", path.display());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_quote_char(Some(b'"')),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}
