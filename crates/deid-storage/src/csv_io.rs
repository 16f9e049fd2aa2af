//! CSV codec for datasets.
//!
//! Cells are typed on read: empty fields become [`Cell::Null`], integer and
//! float literals in canonical form become numeric cells, everything else is
//! text.

use deid_core::{Cell, Dataset};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, StorageError};

lazy_static! {
    static ref INPUT_SEPARATOR: Regex = Regex::new(r"[,\s\-_;|]+").unwrap();
}

/// Type a raw CSV field.
///
/// A field is numeric only when the number prints back to the exact same
/// text, so leading zeros, padding and trailing decimals survive a rewrite.
pub fn parse_cell(raw: &str) -> Cell {
    if raw.is_empty() {
        return Cell::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        if i.to_string() == raw {
            return Cell::Integer(i);
        }
    }
    // Only plain decimal literals; "inf" or "NaN" stay text.
    if raw.chars().any(|c| c.is_ascii_digit())
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        if let Ok(f) = raw.parse::<f64>() {
            if f.to_string() == raw {
                return Cell::Float(f);
            }
        }
    }
    Cell::Text(raw.to_string())
}

pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let mut dataset = Dataset::new(columns);
    for record in reader.records() {
        let record = record?;
        dataset.push_row(record.iter().map(parse_cell).collect());
    }
    debug!("Read {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
}

pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    if dataset.columns.is_empty() {
        return Err(StorageError::InvalidDataset(
            "dataset has no columns".to_string(),
        ));
    }
    let mut writer = csv::WriterBuilder::new().from_path(path)?;
    writer.write_record(&dataset.columns)?;
    for row in &dataset.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| StorageError::io(path, e))?;
    debug!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

/// Split free user input into terms on commas, whitespace, hyphens,
/// underscores, semicolons and pipes.
pub fn parse_input_list(text: &str) -> Vec<String> {
    INPUT_SEPARATOR
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
