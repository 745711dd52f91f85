//! Record Loader: reads the raw table and produces the staging copy.
//!
//! The loader never trims or coerces text. The only representation decision
//! it makes is reading a cell equal to a configured null marker as `None`,
//! since CSV itself has no null.

use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info};

use crate::domain::{Field, RawRecord, WorkingRecord};
use crate::error::LoadError;

/// Map each business field to its column position, or explain the mismatch.
///
/// Column order is free; the set of names must equal the nine-column schema.
pub fn check_schema(headers: &[String]) -> Result<[usize; 9], LoadError> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut unexpected = Vec::new();

    for (index, header) in headers.iter().enumerate() {
        let name = header.trim_start_matches('\u{feff}').trim();
        let known = name.parse::<Field>().is_ok();
        if !known || positions.insert(name, index).is_some() {
            unexpected.push(name.to_string());
        }
    }

    let missing: Vec<String> = Field::ALL
        .iter()
        .filter(|field| !positions.contains_key(field.column_name()))
        .map(|field| field.column_name().to_string())
        .collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(LoadError::SchemaMismatch { missing, unexpected });
    }

    let mut mapping = [0usize; 9];
    for (slot, field) in mapping.iter_mut().zip(Field::ALL.iter()) {
        *slot = positions[field.column_name()];
    }
    Ok(mapping)
}

/// Read every row of a CSV source into raw records, preserving source order.
pub fn load_csv<R: Read>(reader: R, null_markers: &[String]) -> Result<Vec<RawRecord>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mapping = check_schema(&headers)?;
    debug!("Schema accepted with column mapping {:?}", mapping);

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row?;
        let source_row = index + 1;
        if row.len() != headers.len() {
            return Err(LoadError::MalformedRow {
                row: source_row,
                expected: headers.len(),
                found: row.len(),
            });
        }

        let cells = mapping.map(|column| {
            let cell = &row[column];
            if null_markers.iter().any(|marker| marker == cell) {
                None
            } else {
                Some(cell.to_string())
            }
        });
        records.push(RawRecord::from_cells(source_row, cells));
    }

    info!("Loaded {} raw records", records.len());
    Ok(records)
}

/// Copy the raw records into the working set. The raw slice is left untouched.
pub fn stage(raw: &[RawRecord]) -> Vec<WorkingRecord> {
    raw.iter().map(WorkingRecord::from).collect()
}
