//! Store errors.

use cambista_aggregate::AggregateError;
use cambista_format::FormatError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Nothing has been stored yet for what was asked.
    #[error("No data available: {what}")]
    NoDataAvailable {
        /// Description of the missing data.
        what: String,
    },

    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a directory.
    #[error("Failed to read directory '{path}': {source}")]
    ReadDir {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to open or read a file.
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write, rename or remove a file.
    #[error("Failed to write '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A stored file could not be encoded or decoded.
    #[error("Failed to decode '{path}': {source}")]
    Format {
        /// The file being processed.
        path: PathBuf,
        /// The underlying format error.
        source: FormatError,
    },

    /// The summary manifest could not be parsed or serialized.
    #[error("Invalid manifest '{path}': {source}")]
    Manifest {
        /// The manifest path.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Aggregation parameters were rejected.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl StoreError {
    /// Creates a [`StoreError::NoDataAvailable`].
    #[must_use]
    pub fn no_data(what: impl Into<String>) -> Self {
        Self::NoDataAvailable { what: what.into() }
    }

    /// Returns true for [`StoreError::NoDataAvailable`].
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::NoDataAvailable { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
