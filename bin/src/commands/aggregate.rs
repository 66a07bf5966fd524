//! Aggregate command implementation.
//!
//! Rebuilds the summary store from every stored raw run.

use crate::config::AppConfig;
use crate::display::Estimator;
use anyhow::{Context, Result};
use cambista_lib::prelude::*;
use cambista_lib::StoreError;
use chrono::Utc;
use tracing::info;

/// Recomputes all configured summaries.
pub(crate) fn aggregate(
    config: &AppConfig,
    frequencies: &[Frequency],
    estimator: Option<Estimator>,
    range: Option<TimeRange>,
    quiet: bool,
) -> Result<()> {
    let layout = config.layout();
    let raw = RawStore::new(layout.clone());
    let mut cache = DatasetCache::new(config.cache);
    let now = Utc::now();

    let adverts = match raw.load_cached(&mut cache, now) {
        Ok(adverts) => adverts,
        Err(StoreError::NoDataAvailable { .. }) => {
            println!("No data available.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to load raw runs"),
    };

    let mut aggregation = config.aggregation.clone();
    if let Some(estimator) = estimator {
        aggregation.estimator = estimator.resolve(aggregation.estimator);
    }
    if let Some(range) = range {
        aggregation.time_range = range;
    }

    let frequencies = if frequencies.is_empty() {
        &config.frequencies
    } else {
        frequencies
    };
    write_summaries(&layout, &aggregation, &adverts, frequencies, quiet)
}

/// Writes summaries for `frequencies` and prints what was stored.
pub(crate) fn write_summaries(
    layout: &StoreLayout,
    aggregation: &AggregationConfig,
    adverts: &[Advert],
    frequencies: &[Frequency],
    quiet: bool,
) -> Result<()> {
    let manifest = SummaryStore::new(layout.clone())
        .write_all(adverts, aggregation, frequencies, Utc::now())
        .context("Failed to write summaries")?;
    info!(
        records = adverts.len(),
        kept = manifest.full_rows,
        "summaries rebuilt"
    );

    if !quiet {
        println!(
            "Aggregated {} of {} records after filtering",
            manifest.full_rows,
            adverts.len()
        );
        println!("{:<8} {:>8}", "FREQ", "BUCKETS");
        println!("{}", "-".repeat(17));
        for (frequency, buckets) in &manifest.frequencies {
            println!("{:<8} {:>8}", frequency.label(), buckets);
        }
    }
    Ok(())
}
