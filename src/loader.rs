//! CSV loaders for the chlorophyll table and the sea-ice arch table.
//!
//! Header names and field values are trimmed before use, so `" MeanChl "`
//! and `"MeanChl"` name the same column.

use crate::analyzers::types::{AnnotationRecord, AnnotationTable};
use crate::error::LoadError;
use crate::series::{Observation, month_start};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Field delimiter of the arch table.
pub const ARCH_DELIMITER: u8 = b';';

const OBSERVATION_COLUMNS: &[&str] = &["Year", "Month", "MeanChl"];
const ANNOTATION_COLUMNS: &[&str] = &["Region", "Year", "Arch"];

#[derive(Debug, Deserialize)]
struct ObservationRow {
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Month")]
    month: u32,
    #[serde(rename = "Region", default)]
    region: Option<String>,
    #[serde(rename = "MeanChl")]
    mean_chl: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AnnotationRow {
    #[serde(rename = "Region")]
    code: String,
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Arch")]
    status: String,
}

/// Loads the comma-delimited chlorophyll table at `path`.
///
/// Rows of a table without a `Region` column are assigned `default_region`.
pub fn load_observations(path: &Path, default_region: &str) -> Result<Vec<Observation>, LoadError> {
    let file = open(path)?;
    let observations = read_observations(file, &path.display().to_string(), default_region)?;
    info!(path = %path.display(), rows = observations.len(), "Chlorophyll table loaded");
    Ok(observations)
}

/// Loads the semicolon-delimited arch table at `path`.
pub fn load_annotations(path: &Path) -> Result<AnnotationTable, LoadError> {
    let file = open(path)?;
    let table = read_annotations(file, &path.display().to_string())?;
    info!(path = %path.display(), records = table.len(), "Arch table loaded");
    Ok(table)
}

/// Parses chlorophyll rows from any reader. `source_name` labels errors.
///
/// An empty `MeanChl` cell becomes NaN: the row is kept so the month still
/// exists, and downstream stages decide how to treat the missing value.
pub fn read_observations<R: Read>(
    reader: R,
    source_name: &str,
    default_region: &str,
) -> Result<Vec<Observation>, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b',')
        .trim(Trim::All)
        .from_reader(reader);

    let headers = checked_headers(&mut rdr, source_name, OBSERVATION_COLUMNS)?;
    let mut observations = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(source_name, e))?;
        let row: ObservationRow = record
            .deserialize(Some(&headers))
            .map_err(|e| csv_error(source_name, e))?;

        let date = month_start(row.year, row.month).ok_or_else(|| LoadError::InvalidMonth {
            source_name: source_name.to_string(),
            row: record.position().map_or(0, |p| p.line() as usize),
            month: row.month,
        })?;

        let region = match row.region {
            Some(r) if !r.is_empty() => r,
            _ => default_region.to_string(),
        };

        observations.push(Observation {
            date,
            region,
            value: row.mean_chl.unwrap_or(f64::NAN),
        });
    }

    debug!(source = source_name, rows = observations.len(), "Parsed observations");
    Ok(observations)
}

/// Parses arch rows from any reader. `source_name` labels errors.
pub fn read_annotations<R: Read>(reader: R, source_name: &str) -> Result<AnnotationTable, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(ARCH_DELIMITER)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = checked_headers(&mut rdr, source_name, ANNOTATION_COLUMNS)?;
    let mut records = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| csv_error(source_name, e))?;
        let row: AnnotationRow = record
            .deserialize(Some(&headers))
            .map_err(|e| csv_error(source_name, e))?;
        records.push(AnnotationRecord {
            code: row.code,
            year: row.year,
            status: row.status,
        });
    }

    debug!(source = source_name, records = records.len(), "Parsed annotations");
    Ok(AnnotationTable::new(records))
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn checked_headers<R: Read>(
    rdr: &mut csv::Reader<R>,
    source_name: &str,
    required: &[&'static str],
) -> Result<StringRecord, LoadError> {
    let headers = rdr
        .headers()
        .map_err(|e| csv_error(source_name, e))?
        .clone();

    if let Some(&column) = required.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(LoadError::MissingColumn {
            source_name: source_name.to_string(),
            column,
        });
    }

    Ok(headers)
}

fn csv_error(source_name: &str, source: csv::Error) -> LoadError {
    LoadError::Csv {
        source_name: source_name.to_string(),
        source,
    }
}
