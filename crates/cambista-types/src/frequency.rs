//! Resampling frequency definitions.

use chrono::{DateTime, Datelike, Months, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::FrequencyParseError;

const MINUTE: u64 = 60;
const HOUR: u64 = 3_600;
const DAY: u64 = 86_400;
const WEEK: u64 = 7 * DAY;

/// Offset of the first Monday after the Unix epoch (1970-01-05).
const WEEK_ANCHOR: i64 = 4 * DAY as i64;

/// Bucket width used when resampling.
///
/// Fixed-width frequencies are anchored at the Unix epoch, weeks (and custom
/// multiples of a week) start on Monday and months/years start on the
/// calendar boundary, all in UTC. Bucket
/// boundaries therefore depend only on absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum Frequency {
    /// 5-minute buckets.
    Minute5,
    /// 15-minute buckets.
    Minute15,
    /// 30-minute buckets.
    #[default]
    Minute30,
    /// 1-hour buckets.
    Hour1,
    /// Daily buckets.
    Day1,
    /// Weekly buckets starting Monday.
    Week1,
    /// Calendar-month buckets.
    Month1,
    /// Calendar-year buckets.
    Year1,
    /// Arbitrary width in seconds; whole weeks are Monday-anchored.
    Custom(u64),
}

impl Frequency {
    /// Builds a fixed-width frequency, preferring a named variant.
    ///
    /// Returns `None` for a zero width.
    #[must_use]
    pub const fn from_seconds(seconds: u64) -> Option<Self> {
        match seconds {
            0 => None,
            300 => Some(Self::Minute5),
            900 => Some(Self::Minute15),
            1800 => Some(Self::Minute30),
            HOUR => Some(Self::Hour1),
            DAY => Some(Self::Day1),
            s => Some(Self::Custom(s)),
        }
    }

    /// Returns the exact width in seconds for fixed-width frequencies.
    ///
    /// Weekly, monthly and yearly buckets are calendar aligned and return
    /// `None`.
    #[must_use]
    pub const fn fixed_seconds(&self) -> Option<u64> {
        match self {
            Self::Minute5 => Some(5 * MINUTE),
            Self::Minute15 => Some(15 * MINUTE),
            Self::Minute30 => Some(30 * MINUTE),
            Self::Hour1 => Some(HOUR),
            Self::Day1 => Some(DAY),
            Self::Custom(s) => Some(*s),
            Self::Week1 | Self::Month1 | Self::Year1 => None,
        }
    }

    /// Returns the typical width in seconds, used to order frequencies by
    /// coarseness.
    #[must_use]
    pub const fn approx_seconds(&self) -> u64 {
        match self {
            Self::Week1 => WEEK,
            Self::Month1 => 2_629_746,
            Self::Year1 => 31_556_952,
            other => match other.fixed_seconds() {
                Some(s) => s,
                None => 0,
            },
        }
    }

    /// Returns the start of the bucket containing `ts`.
    #[must_use]
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let (width, anchor) = match self {
            Self::Month1 => {
                return Utc
                    .with_ymd_and_hms(ts.year(), ts.month(), 1, 0, 0, 0)
                    .single()
                    .unwrap_or(ts);
            }
            Self::Year1 => {
                return Utc
                    .with_ymd_and_hms(ts.year(), 1, 1, 0, 0, 0)
                    .single()
                    .unwrap_or(ts);
            }
            Self::Week1 => (WEEK, WEEK_ANCHOR),
            Self::Custom(s) if *s >= WEEK && s % WEEK == 0 => (*s, WEEK_ANCHOR),
            fixed => (fixed.fixed_seconds().unwrap_or(1), 0),
        };
        let w = width as i64;
        let start = (ts.timestamp() - anchor).div_euclid(w) * w + anchor;
        DateTime::from_timestamp(start, 0).unwrap_or(ts)
    }

    /// Returns the exclusive end of the bucket starting at `start`.
    #[must_use]
    pub fn next(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Week1 => start + TimeDelta::weeks(1),
            Self::Month1 => start.checked_add_months(Months::new(1)).unwrap_or(start),
            Self::Year1 => start.checked_add_months(Months::new(12)).unwrap_or(start),
            fixed => start + TimeDelta::seconds(fixed.fixed_seconds().unwrap_or(1) as i64),
        }
    }

    /// Returns true for user-supplied widths outside the enumerated set.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Returns the human-readable label (e.g. "15min", "1h", "1month").
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Minute5 => "5min".to_string(),
            Self::Minute15 => "15min".to_string(),
            Self::Minute30 => "30min".to_string(),
            Self::Hour1 => "1h".to_string(),
            Self::Day1 => "1D".to_string(),
            Self::Week1 => "1W".to_string(),
            Self::Month1 => "1month".to_string(),
            Self::Year1 => "1year".to_string(),
            Self::Custom(s) if s % DAY == 0 => format!("{}D", s / DAY),
            Self::Custom(s) if s % HOUR == 0 => format!("{}h", s / HOUR),
            Self::Custom(s) if s % MINUTE == 0 => format!("{}min", s / MINUTE),
            Self::Custom(s) => format!("{s}s"),
        }
    }

    /// Returns a lower-case label safe for file names.
    #[must_use]
    pub fn tag(&self) -> String {
        self.label().to_lowercase()
    }

    /// Returns the enumerated frequencies, finest first.
    #[must_use]
    pub const fn standard() -> &'static [Self] {
        &[
            Self::Minute5,
            Self::Minute15,
            Self::Minute30,
            Self::Hour1,
            Self::Day1,
            Self::Week1,
            Self::Month1,
            Self::Year1,
        ]
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Frequency {
    type Err = FrequencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || FrequencyParseError(s.to_string());
        let lower = s.trim().to_lowercase();
        let split = lower
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(err)?;
        let (digits, unit) = lower.split_at(split);
        let n: u64 = if digits.is_empty() {
            1
        } else {
            digits.parse().map_err(|_| err())?
        };
        if n == 0 {
            return Err(err());
        }

        let unit_seconds = match unit.trim() {
            "s" | "sec" | "second" | "seconds" => 1,
            "min" | "m" | "t" | "minute" | "minutes" => MINUTE,
            "h" | "hour" | "hours" => HOUR,
            "d" | "day" | "days" | "daily" => DAY,
            "w" | "week" | "weeks" | "weekly" if n == 1 => return Ok(Self::Week1),
            "w" | "week" | "weeks" => WEEK,
            "me" | "mo" | "month" | "months" | "monthly" if n == 1 => {
                return Ok(Self::Month1);
            }
            "ye" | "ys" | "y" | "a" | "year" | "years" | "yearly" if n == 1 => {
                return Ok(Self::Year1);
            }
            _ => return Err(err()),
        };

        n.checked_mul(unit_seconds)
            .and_then(Self::from_seconds)
            .ok_or_else(err)
    }
}

impl TryFrom<String> for Frequency {
    type Error = FrequencyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.label()
    }
}
