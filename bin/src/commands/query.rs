//! Query command implementation.

use crate::config::AppConfig;
use crate::display::{Estimator, Format, last_closes, source_note, write_buckets};
use anyhow::{Context, Result};
use cambista_lib::StoreError;
use cambista_lib::prelude::*;
use chrono::Utc;
use std::io::{BufWriter, Write};

/// Options for a bucket query.
#[derive(Debug)]
pub(crate) struct QueryArgs {
    pub(crate) asset: String,
    pub(crate) fiat: Option<String>,
    pub(crate) frequency: Frequency,
    pub(crate) directions: Vec<Direction>,
    pub(crate) range: TimeRange,
    pub(crate) estimator: Option<Estimator>,
    pub(crate) format: Format,
}

/// Prints the buckets matching a query.
pub(crate) fn query(config: &AppConfig, args: QueryArgs, quiet: bool) -> Result<()> {
    let mut query = BucketQuery::new(args.asset, args.frequency).with_time_range(args.range);
    if let Some(fiat) = args.fiat {
        query = query.with_fiat(fiat);
    }
    if !args.directions.is_empty() {
        query = query.with_directions(args.directions);
    }
    if let Some(estimator) = args.estimator {
        query = query.with_estimator(estimator.resolve(config.aggregation.estimator));
    }

    let store = SummaryStore::new(config.layout());
    let result = match store.query(&query, Utc::now()) {
        Ok(result) => result,
        Err(StoreError::NoDataAvailable { .. }) => {
            println!("No data available.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Query failed"),
    };

    if !quiet && let Some(note) = source_note(result.source, query.frequency) {
        eprintln!("{note}");
    }

    let mut out = BufWriter::new(std::io::stdout());
    write_buckets(&result.buckets, args.format, &mut out)?;
    out.flush()?;
    drop(out);

    if result.buckets.is_empty() {
        eprintln!("Query matched no buckets.");
    } else if matches!(args.format, Format::Table) {
        println!("\n{}", last_closes(&result.buckets));
    }
    Ok(())
}
