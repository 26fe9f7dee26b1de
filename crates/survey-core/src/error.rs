use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the survey dashboard.
#[derive(Error, Debug)]
pub enum SurveyError {
    /// The survey export could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The survey export is not well-formed delimited text.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A column needed by the loader or by an analysis is absent.
    #[error("Missing required column: {column}")]
    Schema { column: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document (config file) could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SurveyError {
    /// Shorthand for a [`SurveyError::Schema`] naming `column`.
    pub fn missing_column(column: impl Into<String>) -> Self {
        SurveyError::Schema {
            column: column.into(),
        }
    }
}

/// Convenience alias used throughout the survey crates.
pub type Result<T> = std::result::Result<T, SurveyError>;
