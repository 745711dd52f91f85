//! Date Converter, plus conversion of the two count columns to integers.
//!
//! Conversion failures never abort the run: the cell becomes null and the
//! failure is recorded so the report can surface it.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::{Field, WorkingRecord};
use crate::error::{DateParseError, NumericParseError};

#[derive(Debug, Clone)]
pub struct ConvertOutcome {
    pub records: Vec<WorkingRecord>,
    pub date_failures: Vec<DateParseError>,
    pub numeric_failures: Vec<NumericParseError>,
}

pub struct DateConverter {
    format: String,
}

impl DateConverter {
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
        }
    }

    /// Parse one raw date cell. Null and blank cells are `Ok(None)`.
    pub fn parse(&self, source_row: usize, raw: Option<&str>) -> Result<Option<NaiveDate>, DateParseError> {
        let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        NaiveDate::parse_from_str(text, &self.format)
            .map(Some)
            .map_err(|_| DateParseError {
                source_row,
                raw: text.to_string(),
                format: self.format.clone(),
            })
    }

    pub fn convert(&self, records: &[WorkingRecord]) -> ConvertOutcome {
        let mut date_failures = Vec::new();
        let mut numeric_failures = Vec::new();

        let converted = records
            .iter()
            .map(|record| {
                let mut record = record.clone();

                record.event_date = match self.parse(record.source_row, record.date.as_deref()) {
                    Ok(date) => date,
                    Err(e) => {
                        warn!("{}", e);
                        date_failures.push(e);
                        None
                    }
                };

                record.laid_off = convert_count(&record, Field::TotalLaidOff, &mut numeric_failures);
                record.funds_raised = convert_count(&record, Field::FundsRaisedMillions, &mut numeric_failures);
                record
            })
            .collect();

        info!(
            "Converted {} records: {} date parse failures, {} numeric parse failures",
            records.len(),
            date_failures.len(),
            numeric_failures.len()
        );

        ConvertOutcome {
            records: converted,
            date_failures,
            numeric_failures,
        }
    }
}

fn convert_count(record: &WorkingRecord, field: Field, failures: &mut Vec<NumericParseError>) -> Option<i64> {
    match parse_count(record.text(field)) {
        Ok(value) => value,
        Err(raw) => {
            debug!("Row {}: {} value {:?} is not a number", record.source_row, field, raw);
            failures.push(NumericParseError {
                source_row: record.source_row,
                field,
                raw,
            });
            None
        }
    }
}

/// Parse a count cell. Blank is null; decimals round half away from zero.
pub fn parse_count(raw: Option<&str>) -> Result<Option<i64>, String> {
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    if let Ok(value) = text.parse::<i64>() {
        return Ok(Some(value));
    }

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() < i64::MAX as f64 => Ok(Some(value.round() as i64)),
        _ => Err(text.to_string()),
    }
}
