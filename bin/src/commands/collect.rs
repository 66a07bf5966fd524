//! Collect command implementation.
//!
//! Fetches every configured market, normalizes the records and appends them
//! to the raw store as one run.

use crate::commands::aggregate::write_summaries;
use crate::config::AppConfig;
use crate::display::metrics_note;
use anyhow::{Context, Result};
use cambista_lib::prelude::*;
use cambista_lib::{RawRecord, StoreError};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

/// Runs one ingestion pass.
pub(crate) async fn collect(config: &AppConfig, aggregate: bool, quiet: bool) -> Result<()> {
    let client = P2pClient::new(config.client.clone()).context("Failed to create HTTP client")?;
    let triples = config.collector.triples();
    let run_time = Utc::now();

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(triples.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} markets {msg}")
                .context("Invalid progress template")?
                .progress_chars("=>-"),
        );
        pb
    };

    let outcomes = collect_all(&client, &config.collector, run_time, |outcome| {
        progress.set_message(format!("{} ({} records)", outcome.triple, outcome.len()));
        progress.inc(1);
    })
    .await;

    let failed = outcomes.iter().filter(|o| !o.is_complete()).count();
    let finish_msg = if failed > 0 {
        format!("Collected {} markets ({failed} incomplete)", outcomes.len())
    } else {
        format!("Collected {} markets", outcomes.len())
    };
    progress.finish_with_message(finish_msg);

    if !quiet {
        for outcome in &outcomes {
            let status = outcome
                .error
                .as_ref()
                .map_or_else(|| "ok".to_string(), |e| format!("partial: {e}"));
            println!(
                "{:<16} {:>6} records {:>4} pages  {status}",
                outcome.triple.to_string(),
                outcome.len(),
                outcome.pages
            );
        }
    }

    let records: Vec<RawRecord> = outcomes.into_iter().flat_map(|o| o.records).collect();
    let batch = normalize(&records);
    if batch.dropped > 0 {
        warn!(dropped = batch.dropped, "records missing required fields were dropped");
    }
    if batch.adverts.is_empty() {
        println!("No records collected.");
        return Ok(());
    }

    let layout = config.layout();
    let path = RawStore::new(layout.clone())
        .append_run(&batch.adverts, run_time)
        .context("Failed to store raw run")?;
    let note = metrics_note(&batch.columns);
    info!(columns = batch.columns.len(), %note, "run normalized");

    if !quiet {
        println!(
            "Stored {} records ({} dropped) in {}",
            batch.adverts.len(),
            batch.dropped,
            path.display()
        );
        println!("{note}");
    }

    if aggregate {
        let raw = RawStore::new(layout.clone());
        let adverts = match raw.load_all() {
            Ok(adverts) => adverts,
            Err(StoreError::NoDataAvailable { .. }) => return Ok(()),
            Err(e) => return Err(e).context("Failed to load raw runs"),
        };
        write_summaries(&layout, &config.aggregation, &adverts, &config.frequencies, quiet)?;
    }

    Ok(())
}
