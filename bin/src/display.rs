//! Display utilities and output formatting for the cambista CLI.

use anyhow::Result;
use cambista_lib::prelude::*;
use cambista_lib::{Metric, QuerySource, latest_close};
use clap::ValueEnum;
use std::io::Write;

/// Output format for query results.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    Table,
    Csv,
    Json,
    Ndjson,
}

/// Estimator selected on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum Estimator {
    Naive,
    Weighted,
}

impl Estimator {
    /// Resolves to an estimator mode, taking Beta shapes from `configured`
    /// when it is already weighted.
    pub(crate) fn resolve(self, configured: EstimatorMode) -> EstimatorMode {
        match (self, configured) {
            (Self::Naive, _) => EstimatorMode::Naive,
            (Self::Weighted, EstimatorMode::Weighted(policy)) => EstimatorMode::Weighted(policy),
            (Self::Weighted, EstimatorMode::Naive) => {
                EstimatorMode::Weighted(BetaPolicy::default())
            }
        }
    }
}

/// Writes buckets to `writer` in the given format.
pub(crate) fn write_buckets<W: Write + Send>(
    buckets: &[Bucket],
    format: Format,
    mut writer: W,
) -> Result<()> {
    match format {
        Format::Table => write_table(buckets, &mut writer)?,
        Format::Csv => CsvFormatter::new().write_buckets(buckets, writer)?,
        Format::Json => JsonFormatter::new().write_buckets(buckets, writer)?,
        Format::Ndjson => JsonFormatter::ndjson().write_buckets(buckets, writer)?,
    }
    Ok(())
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

fn write_table<W: Write>(buckets: &[Bucket], writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "{:<20} {:<6} {:<10} {:<5} {:>10} {:>10} {:>10} {:>10} {:>12} {:>5}",
        "INTERVAL", "FREQ", "MARKET", "DIR", "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME", "ADS"
    )?;
    for bucket in buckets {
        writeln!(
            writer,
            "{:<20} {:<6} {:<10} {:<5} {:>10.4} {:>10.4} {:>10.4} {:>10} {:>12} {:>5}",
            bucket.interval_start.format("%Y-%m-%d %H:%M").to_string(),
            bucket.frequency.label(),
            format!("{}/{}", bucket.asset, bucket.fiat_unit),
            bucket.direction.as_str(),
            bucket.open,
            bucket.high,
            bucket.low,
            opt(bucket.close, 4),
            opt(bucket.volume, 2),
            bucket.num_ads,
        )?;
    }
    Ok(())
}

/// Describes where the buckets came from, if it is worth mentioning.
pub(crate) fn source_note(source: QuerySource, requested: Frequency) -> Option<String> {
    match source {
        QuerySource::Summary(_) => None,
        QuerySource::Resampled => Some(format!(
            "No {requested} summary stored; resampled from full-resolution records."
        )),
        QuerySource::Coarser(f) | QuerySource::Finer(f) => Some(format!(
            "No {requested} data available; showing nearest stored frequency {f}."
        )),
    }
}

/// Renders the most recent SELL and BUY closes.
pub(crate) fn last_closes(buckets: &[Bucket]) -> String {
    let sell = latest_close(buckets, &Direction::Sell);
    let buy = latest_close(buckets, &Direction::Buy);
    format!("Last close: SELL {}  BUY {}", opt(sell, 4), opt(buy, 4))
}

/// Names the optional metrics a run's columns can feed.
pub(crate) fn metrics_note(columns: &ColumnSet) -> String {
    let names: Vec<&str> = Metric::available(columns).iter().map(Metric::as_str).collect();
    if names.is_empty() {
        "Optional metrics: none".to_string()
    } else {
        format!("Optional metrics: {}", names.join(", "))
    }
}

/// Formats a byte count for humans.
pub(crate) fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bucket(direction: Direction, close: Option<f64>) -> Bucket {
        Bucket {
            interval_start: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            frequency: Frequency::Hour1,
            asset: "USDT".to_string(),
            fiat_unit: "BOB".to_string(),
            direction,
            open: 9.9,
            high: 10.0,
            low: 9.8,
            close,
            volume: None,
            num_ads: 2,
            num_transactions: None,
        }
    }

    #[test]
    fn test_table_output() {
        let mut out = Vec::new();
        write_buckets(&[bucket(Direction::Sell, None)], Format::Table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("INTERVAL"));
        assert!(lines[1].contains("USDT/BOB"));
        assert!(lines[1].contains("SELL"));
    }

    #[test]
    fn test_last_closes() {
        let buckets = [bucket(Direction::Sell, Some(9.95)), bucket(Direction::Buy, None)];
        assert_eq!(last_closes(&buckets), "Last close: SELL 9.9500  BUY -");
    }

    #[test]
    fn test_estimator_resolution() {
        let custom = EstimatorMode::Weighted(BetaPolicy::new(2.0, 3.0, 3.0, 2.0));
        assert_eq!(Estimator::Weighted.resolve(custom), custom);
        assert_eq!(
            Estimator::Weighted.resolve(EstimatorMode::Naive),
            EstimatorMode::Weighted(BetaPolicy::default())
        );
        assert_eq!(Estimator::Naive.resolve(custom), EstimatorMode::Naive);
    }

    #[test]
    fn test_source_note() {
        assert!(source_note(QuerySource::Summary(Frequency::Hour1), Frequency::Hour1).is_none());
        let note = source_note(QuerySource::Coarser(Frequency::Day1), Frequency::Hour1).unwrap();
        assert!(note.contains("1D"));
    }

    #[test]
    fn test_metrics_note() {
        let mut columns: ColumnSet = Column::REQUIRED.iter().copied().collect();
        assert_eq!(metrics_note(&columns), "Optional metrics: none");
        columns.insert(Column::TradableQuantity);
        assert_eq!(metrics_note(&columns), "Optional metrics: volume, weighted_close");
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KiB");
    }
}
