//! Error types for the chime reminder engine
//!
//! All errors use thiserror for structured error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Malformed event record: {0}")]
    MalformedRecord(String),

    #[error("{0}")]
    Generic(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
