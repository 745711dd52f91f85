//! Record shapes shared by every layer of the cleaner.
//!
//! Records move through three shapes: [`RawRecord`] as loaded, [`WorkingRecord`]
//! while stages run, and [`CleanRecord`] as committed output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// The nine business columns, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Company,
    Location,
    Industry,
    TotalLaidOff,
    PercentageLaidOff,
    Date,
    Stage,
    Country,
    FundsRaisedMillions,
}

/// How a field compares when a rank criterion orders by value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Numeric,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Company,
        Field::Location,
        Field::Industry,
        Field::TotalLaidOff,
        Field::PercentageLaidOff,
        Field::Date,
        Field::Stage,
        Field::Country,
        Field::FundsRaisedMillions,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            Field::Company => "company",
            Field::Location => "location",
            Field::Industry => "industry",
            Field::TotalLaidOff => "total_laid_off",
            Field::PercentageLaidOff => "percentage_laid_off",
            Field::Date => "date",
            Field::Stage => "stage",
            Field::Country => "country",
            Field::FundsRaisedMillions => "funds_raised_millions",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::TotalLaidOff | Field::FundsRaisedMillions => FieldKind::Numeric,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.column_name() == s)
            .ok_or_else(|| format!("Unknown field: {}", s))
    }
}

/// One row exactly as it came out of the source. `None` is a source null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// 1-based data row number in the source
    pub source_row: usize,
    pub company: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub total_laid_off: Option<String>,
    pub percentage_laid_off: Option<String>,
    pub date: Option<String>,
    pub stage: Option<String>,
    pub country: Option<String>,
    pub funds_raised_millions: Option<String>,
}

impl RawRecord {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Company => self.company.as_deref(),
            Field::Location => self.location.as_deref(),
            Field::Industry => self.industry.as_deref(),
            Field::TotalLaidOff => self.total_laid_off.as_deref(),
            Field::PercentageLaidOff => self.percentage_laid_off.as_deref(),
            Field::Date => self.date.as_deref(),
            Field::Stage => self.stage.as_deref(),
            Field::Country => self.country.as_deref(),
            Field::FundsRaisedMillions => self.funds_raised_millions.as_deref(),
        }
    }

    /// Build a record from cells given in schema order
    pub fn from_cells(source_row: usize, cells: [Option<String>; 9]) -> Self {
        let [company, location, industry, total_laid_off, percentage_laid_off, date, stage, country, funds_raised_millions] =
            cells;
        Self {
            source_row,
            company,
            location,
            industry,
            total_laid_off,
            percentage_laid_off,
            date,
            stage,
            country,
            funds_raised_millions,
        }
    }
}

/// Mutable projection of a [`RawRecord`] used while the stages run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingRecord {
    pub source_row: usize,
    pub company: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub total_laid_off: Option<String>,
    pub percentage_laid_off: Option<String>,
    pub date: Option<String>,
    pub stage: Option<String>,
    pub country: Option<String>,
    pub funds_raised_millions: Option<String>,
    /// Position within its duplicate group; only meaningful inside deduplication
    pub rank: Option<u32>,
    pub event_date: Option<NaiveDate>,
    pub laid_off: Option<i64>,
    pub funds_raised: Option<i64>,
}

impl WorkingRecord {
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Company => self.company.as_deref(),
            Field::Location => self.location.as_deref(),
            Field::Industry => self.industry.as_deref(),
            Field::TotalLaidOff => self.total_laid_off.as_deref(),
            Field::PercentageLaidOff => self.percentage_laid_off.as_deref(),
            Field::Date => self.date.as_deref(),
            Field::Stage => self.stage.as_deref(),
            Field::Country => self.country.as_deref(),
            Field::FundsRaisedMillions => self.funds_raised_millions.as_deref(),
        }
    }

    pub fn text_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Company => &mut self.company,
            Field::Location => &mut self.location,
            Field::Industry => &mut self.industry,
            Field::TotalLaidOff => &mut self.total_laid_off,
            Field::PercentageLaidOff => &mut self.percentage_laid_off,
            Field::Date => &mut self.date,
            Field::Stage => &mut self.stage,
            Field::Country => &mut self.country,
            Field::FundsRaisedMillions => &mut self.funds_raised_millions,
        }
    }

    /// True when the percentage cell carries a usable value
    pub fn has_percentage(&self) -> bool {
        !is_blank(self.percentage_laid_off.as_deref())
    }
}

impl From<&RawRecord> for WorkingRecord {
    fn from(raw: &RawRecord) -> Self {
        Self {
            source_row: raw.source_row,
            company: raw.company.clone(),
            location: raw.location.clone(),
            industry: raw.industry.clone(),
            total_laid_off: raw.total_laid_off.clone(),
            percentage_laid_off: raw.percentage_laid_off.clone(),
            date: raw.date.clone(),
            stage: raw.stage.clone(),
            country: raw.country.clone(),
            funds_raised_millions: raw.funds_raised_millions.clone(),
            rank: None,
            event_date: None,
            laid_off: None,
            funds_raised: None,
        }
    }
}

/// Final, typed output row. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CleanRecord {
    pub company: Option<String>,
    pub location: Option<String>,
    pub industry: Option<String>,
    pub total_laid_off: Option<i64>,
    pub percentage_laid_off: Option<String>,
    pub date: Option<NaiveDate>,
    pub stage: Option<String>,
    pub country: Option<String>,
    pub funds_raised_millions: Option<i64>,
}

impl From<&WorkingRecord> for CleanRecord {
    fn from(record: &WorkingRecord) -> Self {
        Self {
            company: record.company.clone(),
            location: record.location.clone(),
            industry: record.industry.clone(),
            total_laid_off: record.laid_off,
            percentage_laid_off: record.percentage_laid_off.clone(),
            date: record.event_date,
            stage: record.stage.clone(),
            country: record.country.clone(),
            funds_raised_millions: record.funds_raised,
        }
    }
}

impl CleanRecord {
    pub fn has_percentage(&self) -> bool {
        !is_blank(self.percentage_laid_off.as_deref())
    }
}

/// Encode a clean table as CSV with a header row.
///
/// This is the canonical byte form of the output: the sink writes exactly
/// these bytes and the run digest is computed over them.
pub fn write_clean_csv<W: Write>(records: &[CleanRecord], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    if records.is_empty() {
        csv_writer.write_record(Field::ALL.iter().map(|f| f.column_name()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
