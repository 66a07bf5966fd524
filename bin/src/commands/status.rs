//! Store status command.

use crate::config::AppConfig;
use crate::display::human_bytes;
use anyhow::{Context, Result};
use cambista_lib::prelude::*;
use chrono::{DateTime, Utc};

/// Lists stored raw runs and summary frequencies.
pub(crate) fn status(config: &AppConfig, all: bool) -> Result<()> {
    let layout = config.layout();
    println!("Data directory: {}", layout.data_dir().display());

    let raw = RawStore::new(layout.clone());
    let runs = raw.runs().context("Failed to list raw runs")?;
    if runs.is_empty() {
        println!("\nNo raw runs stored.");
    } else {
        let total: u64 = runs.iter().map(|r| r.bytes).sum();
        println!("\nRaw runs: {} ({})", runs.len(), human_bytes(total));
        let shown = if all { runs.len() } else { runs.len().min(10) };
        println!("{:<48} {:>10} {:<20}", "FILE", "SIZE", "MODIFIED");
        println!("{}", "-".repeat(80));
        for run in &runs[runs.len() - shown..] {
            let name = run
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let modified = run
                .modified
                .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "N/A".into());
            println!("{name:<48} {:>10} {modified:<20}", human_bytes(run.bytes));
        }
        if shown < runs.len() {
            println!("... {} older runs (use --all to list)", runs.len() - shown);
        }
    }

    let summaries = SummaryStore::new(layout);
    let available = summaries.available().context("Failed to list summaries")?;
    if available.is_empty() {
        println!("\nNo summaries stored. Run `cambista aggregate`.");
        return Ok(());
    }

    let labels: Vec<String> = available.iter().map(Frequency::label).collect();
    println!("\nSummaries: {}", labels.join(", "));
    if let Some(manifest) = summaries.manifest().context("Failed to read manifest")? {
        println!(
            "Generated: {}",
            manifest.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("Records:   {}", manifest.full_rows);
        println!(
            "Estimator: {}",
            if manifest.config.estimator.is_weighted() {
                "weighted"
            } else {
                "naive"
            }
        );
    }
    Ok(())
}
