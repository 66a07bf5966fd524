//! Parse errors for cambista core types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error returned when parsing an invalid frequency string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "invalid frequency '{0}', expected one of: 5min, 15min, 30min, 1h, 1D, 1W, 1month, 1year or <n><s|min|h|D|W>"
)]
pub struct FrequencyParseError(pub String);

/// Error for invalid time ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeError {
    /// Start is after end.
    #[error("Invalid time range: {start} > {end}")]
    InvalidRange {
        /// The start bound.
        start: DateTime<Utc>,
        /// The end bound.
        end: DateTime<Utc>,
    },

    /// The string is not a recognised range.
    #[error("invalid time range '{0}', expected day, week, year, all or <start>..<end>")]
    Parse(String),
}
