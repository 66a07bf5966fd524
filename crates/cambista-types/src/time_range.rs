//! Time windows for selecting observations.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::TimeRangeError;

/// A window of time relative to "now", or explicit bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum TimeRange {
    /// The last 24 hours.
    LastDay,
    /// The last 7 days.
    LastWeek,
    /// The last 365 days.
    LastYear,
    /// No restriction.
    #[default]
    AllTime,
    /// Explicit bounds: `start` inclusive, `end` exclusive.
    Between {
        /// Inclusive lower bound.
        start: DateTime<Utc>,
        /// Exclusive upper bound.
        end: DateTime<Utc>,
    },
}

impl TimeRange {
    /// Creates an explicit range, validating that start <= end.
    ///
    /// # Errors
    ///
    /// Returns an error if start > end.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeRangeError> {
        if start > end {
            return Err(TimeRangeError::InvalidRange { start, end });
        }
        Ok(Self::Between { start, end })
    }

    /// Resolves the range against `now` into (inclusive lower, exclusive
    /// upper) bounds. `None` means unbounded on that side.
    #[must_use]
    pub fn bounds(&self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self {
            Self::LastDay => (Some(now - TimeDelta::days(1)), None),
            Self::LastWeek => (Some(now - TimeDelta::weeks(1)), None),
            Self::LastYear => (Some(now - TimeDelta::days(365)), None),
            Self::AllTime => (None, None),
            Self::Between { start, end } => (Some(*start), Some(*end)),
        }
    }

    /// Returns true if `ts` falls inside the range resolved against `now`.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let (lower, upper) = self.bounds(now);
        lower.is_none_or(|l| ts >= l) && upper.is_none_or(|u| ts < u)
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LastDay => write!(f, "last-day"),
            Self::LastWeek => write!(f, "last-week"),
            Self::LastYear => write!(f, "last-year"),
            Self::AllTime => write!(f, "all-time"),
            Self::Between { start, end } => write!(
                f,
                "{}..{}",
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
                end.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
        }
    }
}

impl FromStr for TimeRange {
    type Err = TimeRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "day" | "last-day" | "last_day" => return Ok(Self::LastDay),
            "week" | "last-week" | "last_week" => return Ok(Self::LastWeek),
            "year" | "last-year" | "last_year" => return Ok(Self::LastYear),
            "all" | "all-time" | "all_time" => return Ok(Self::AllTime),
            _ => {}
        }

        let (start, end) = s
            .split_once("..")
            .ok_or_else(|| TimeRangeError::Parse(s.to_string()))?;
        let parse = |part: &str| {
            DateTime::parse_from_rfc3339(part.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| TimeRangeError::Parse(s.to_string()))
        };
        Self::between(parse(start)?, parse(end)?)
    }
}

impl TryFrom<String> for TimeRange {
    type Error = TimeRangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeRange> for String {
    fn from(value: TimeRange) -> Self {
        value.to_string()
    }
}
