use thiserror::Error;

use crate::domain::Field;

/// Whole-run input failures. Raised before any record is mutated.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Source is unreadable: {0}")]
    Unreadable(String),

    #[error("Schema mismatch: missing columns {missing:?}, unexpected columns {unexpected:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Malformed row {row}: expected {expected} cells, found {found}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single unparseable date cell. Non-fatal: the record keeps a null date.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[error("Row {source_row}: cannot parse date {raw:?} with format {format:?}")]
pub struct DateParseError {
    pub source_row: usize,
    pub raw: String,
    pub format: String,
}

/// A single unparseable count cell. Non-fatal: the record keeps a null number.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[error("Row {source_row}: cannot parse {field} value {raw:?} as an integer")]
pub struct NumericParseError {
    pub source_row: usize,
    pub field: Field,
    pub raw: String,
}

/// Invariant violations detected on the final clean set.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyError {
    #[error("{groups} duplicate groups remain in the clean set")]
    DuplicateGroups { groups: usize },

    #[error("{records} records have neither total_laid_off nor percentage_laid_off")]
    MissingQuantities { records: usize },

    #[error("{records} records have a null industry although a (company, location) donor exists")]
    EnrichableIndustry { records: usize },
}

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Clean set failed validation: {}", summarize(.0))]
    Consistency(Vec<ConsistencyError>),
}

fn summarize(errors: &[ConsistencyError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, CleanerError>;
