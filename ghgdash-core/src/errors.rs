use thiserror::Error;

use crate::observation::Year;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum GhgError {
    #[error("{0}")]
    Error(String),
    #[error("Source table is missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },
    #[error("Invalid record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },
    #[error("Invalid year range: start={start} is after end={end}")]
    InvalidYearRange { start: Year, end: Year },
    #[error("Unknown region: {0}")]
    UnknownRegion(String),
    #[error("Invalid value for parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("No value available at reference year {0}")]
    MissingReferenceYear(Year),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),
    #[error(transparent)]
    SpreadsheetRow(#[from] calamine::DeError),
}

/// Convenience type for `Result<T, GhgError>`.
pub type GhgResult<T> = Result<T, GhgError>;
