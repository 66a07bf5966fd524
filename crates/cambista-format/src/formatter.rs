//! Output format abstraction.

use cambista_aggregate::Bucket;
use cambista_types::Advert;
use std::io::Write;
use thiserror::Error;

/// Output format identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// CSV format.
    #[default]
    Csv,
    /// JSON array format.
    Json,
    /// Newline-delimited JSON format.
    Ndjson,
    /// Apache Parquet format.
    Parquet,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Parquet => "parquet",
        }
    }

    /// Returns all available formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Csv, Self::Json, Self::Ndjson, Self::Parquet]
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            "parquet" | "pq" => Ok(Self::Parquet),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

/// Errors that can occur while encoding or decoding records.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Unknown output format.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow/Parquet error.
    #[error("Parquet error: {0}")]
    Parquet(String),

    /// A required column is absent from the file.
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),

    /// A required column holds a null.
    #[error("Null value in required column {column} at row {row}")]
    NullValue {
        /// Column name.
        column: &'static str,
        /// Zero-based row within the file.
        row: usize,
    },

    /// A stored value could not be decoded.
    #[error("Invalid value in column {column}: {message}")]
    InvalidValue {
        /// Column name.
        column: &'static str,
        /// Decoder message.
        message: String,
    },
}

/// Trait for output formatters.
pub trait Formatter: Send + Sync {
    /// Writes advertisement records to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_adverts<W: Write + Send>(
        &self,
        adverts: &[Advert],
        writer: W,
    ) -> Result<(), FormatError>;

    /// Writes aggregated buckets to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_buckets<W: Write + Send>(
        &self,
        buckets: &[Bucket],
        writer: W,
    ) -> Result<(), FormatError>;

    /// Returns the file extension for this format.
    fn extension(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("NDJSON".parse::<OutputFormat>().unwrap(), OutputFormat::Ndjson);
        assert_eq!("pq".parse::<OutputFormat>().unwrap(), OutputFormat::Parquet);
        assert!(matches!(
            "xlsx".parse::<OutputFormat>(),
            Err(FormatError::UnknownFormat(_))
        ));
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
