//! JSON output format.

use cambista_aggregate::Bucket;
use cambista_types::Advert;
use serde::Serialize;
use std::io::Write;

use crate::{FormatError, Formatter};

/// JSON output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    /// JSON array (standard JSON).
    #[default]
    Array,
    /// Newline-delimited JSON (NDJSON/JSONL).
    Ndjson,
}

/// JSON formatter.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    /// Output style.
    style: JsonStyle,
    /// Whether to pretty-print (only for array style).
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter with default settings (array style).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            style: JsonStyle::Array,
            pretty: false,
        }
    }

    /// Creates a new NDJSON formatter.
    #[must_use]
    pub const fn ndjson() -> Self {
        Self {
            style: JsonStyle::Ndjson,
            pretty: false,
        }
    }

    /// Sets whether to pretty-print output (array style only).
    #[must_use]
    pub const fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the output style.
    #[must_use]
    pub const fn with_style(mut self, style: JsonStyle) -> Self {
        self.style = style;
        self
    }

    fn write_items<T: Serialize, W: Write>(
        &self,
        items: &[T],
        mut writer: W,
    ) -> Result<(), FormatError> {
        match self.style {
            JsonStyle::Array => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut writer, items)?;
                } else {
                    serde_json::to_writer(&mut writer, items)?;
                }
                writeln!(writer)?;
            }
            JsonStyle::Ndjson => {
                for item in items {
                    serde_json::to_writer(&mut writer, item)?;
                    writeln!(writer)?;
                }
            }
        }
        Ok(())
    }
}

impl Formatter for JsonFormatter {
    fn write_adverts<W: Write + Send>(
        &self,
        adverts: &[Advert],
        writer: W,
    ) -> Result<(), FormatError> {
        self.write_items(adverts, writer)
    }

    fn write_buckets<W: Write + Send>(
        &self,
        buckets: &[Bucket],
        writer: W,
    ) -> Result<(), FormatError> {
        self.write_items(buckets, writer)
    }

    fn extension(&self) -> &str {
        match self.style {
            JsonStyle::Array => "json",
            JsonStyle::Ndjson => "ndjson",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cambista_types::{Direction, Frequency};
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    fn bucket(close: Option<f64>) -> Bucket {
        Bucket {
            interval_start: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            frequency: Frequency::Hour1,
            asset: "USDT".to_string(),
            fiat_unit: "BOB".to_string(),
            direction: Direction::Sell,
            open: 9.9,
            high: 10.0,
            low: 9.8,
            close,
            volume: None,
            num_ads: 3,
            num_transactions: None,
        }
    }

    #[test]
    fn test_undefined_close_is_null_not_zero() {
        let mut out = Vec::new();
        JsonFormatter::new()
            .write_buckets(&[bucket(None), bucket(Some(9.95))], &mut out)
            .unwrap();

        let rows: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0]["close"].is_null());
        assert!(rows[0]["volume"].is_null());
        assert_eq!(rows[1]["close"], 9.95);
        assert_eq!(rows[0]["frequency"], "1h");
        assert_eq!(rows[0]["direction"], "SELL");
    }

    #[test]
    fn test_ndjson_keeps_unknown_direction() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let adverts = [
            Advert::new("1185", Direction::Buy, "USDT", "BOB", 9.95, timestamp),
            Advert::new("1186", Direction::from("BLOCK"), "USDT", "BOB", 9.97, timestamp)
                .with_quantity(120.0),
        ];
        let mut out = Vec::new();
        JsonFormatter::ndjson().write_adverts(&adverts, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["direction"], "BUY");
        assert!(lines[0]["tradable_quantity"].is_null());
        assert_eq!(lines[1]["direction"], "BLOCK");
        assert_eq!(lines[1]["tradable_quantity"], 120.0);
    }

    #[test]
    fn test_empty_selection_and_extension() {
        let mut out = Vec::new();
        JsonFormatter::new().with_pretty(true).write_buckets(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[]\n");

        let mut out = Vec::new();
        JsonFormatter::ndjson().write_buckets(&[], &mut out).unwrap();
        assert!(out.is_empty());

        assert_eq!(JsonFormatter::new().extension(), "json");
        assert_eq!(JsonFormatter::new().with_style(JsonStyle::Ndjson).extension(), "ndjson");
    }
}
