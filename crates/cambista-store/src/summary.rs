//! Precomputed bucket summaries and the query interface over them.

use cambista_aggregate::{AggregationConfig, Bucket, EstimatorMode, Resampler, VolumeAgg};
use cambista_format::{Formatter, ParquetFormatter, ParquetReader};
use cambista_types::{Advert, Direction, Frequency, TimeRange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::layout::{BUCKETS_PREFIX, FULL_FILE, MANIFEST_FILE, ensure_dir, list_files};
use crate::{Result, StoreError, StoreLayout};

/// Parameters a summary set was computed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryManifest {
    /// Aggregation configuration used for every bucket file.
    pub config: AggregationConfig,
    /// When the summaries were computed.
    pub generated_at: DateTime<Utc>,
    /// Rows in the full-resolution artifact.
    pub full_rows: usize,
    /// Stored frequencies and their bucket counts.
    pub frequencies: Vec<(Frequency, usize)>,
}

/// Where a query's buckets came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    /// The stored summary at the requested frequency.
    Summary(Frequency),
    /// Resampled on demand from the full-resolution artifact.
    Resampled,
    /// The nearest stored coarser frequency.
    Coarser(Frequency),
    /// The nearest stored finer frequency.
    Finer(Frequency),
}

impl QuerySource {
    /// Returns the frequency of the returned buckets, given the requested one.
    #[must_use]
    pub const fn frequency(&self, requested: Frequency) -> Frequency {
        match self {
            Self::Summary(f) | Self::Coarser(f) | Self::Finer(f) => *f,
            Self::Resampled => requested,
        }
    }

    /// Returns true if the buckets are not at the requested frequency.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Coarser(_) | Self::Finer(_))
    }
}

/// Result of a bucket query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Source the buckets were read from.
    pub source: QuerySource,
    /// Matching buckets, ordered by market then interval start. May be empty.
    pub buckets: Vec<Bucket>,
}

/// A request for buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketQuery {
    /// Asset symbol.
    pub asset: String,
    /// Optional fiat filter.
    pub fiat_unit: Option<String>,
    /// Directions to return; `None` returns every direction.
    pub directions: Option<BTreeSet<Direction>>,
    /// Requested bucket width.
    pub frequency: Frequency,
    /// Window on bucket start times.
    pub time_range: TimeRange,
    /// Required estimator; `None` accepts whatever the summaries used.
    pub estimator: Option<EstimatorMode>,
}

impl BucketQuery {
    /// Creates a query for every direction of an asset over all time.
    #[must_use]
    pub fn new(asset: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            asset: asset.into(),
            fiat_unit: None,
            directions: None,
            frequency,
            time_range: TimeRange::AllTime,
            estimator: None,
        }
    }

    /// Restricts the query to one fiat currency.
    #[must_use]
    pub fn with_fiat(mut self, fiat_unit: impl Into<String>) -> Self {
        self.fiat_unit = Some(fiat_unit.into());
        self
    }

    /// Restricts the query to the given directions.
    #[must_use]
    pub fn with_directions(mut self, directions: impl IntoIterator<Item = Direction>) -> Self {
        self.directions = Some(directions.into_iter().collect());
        self
    }

    /// Sets the time window.
    #[must_use]
    pub const fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    /// Requires a specific estimator.
    #[must_use]
    pub const fn with_estimator(mut self, estimator: EstimatorMode) -> Self {
        self.estimator = Some(estimator);
        self
    }

    fn matches(&self, bucket: &Bucket, now: DateTime<Utc>) -> bool {
        bucket.asset == self.asset
            && self.fiat_unit.as_ref().is_none_or(|f| &bucket.fiat_unit == f)
            && self
                .directions
                .as_ref()
                .is_none_or(|set| set.contains(&bucket.direction))
            && self.time_range.contains(bucket.interval_start, now)
    }
}

/// Summary store: one bucket file per frequency plus the filtered
/// full-resolution records, replaced wholesale on every write.
#[derive(Debug, Clone)]
pub struct SummaryStore {
    layout: StoreLayout,
    formatter: ParquetFormatter,
    reader: ParquetReader,
}

impl SummaryStore {
    /// Creates a summary store over the given layout.
    #[must_use]
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            layout,
            formatter: ParquetFormatter::new(),
            reader: ParquetReader::new(),
        }
    }

    /// Returns the layout.
    #[must_use]
    pub const fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Recomputes every listed frequency and the full-resolution artifact,
    /// then swaps the new set in place of the old one.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or any file cannot
    /// be written. On error the previous summaries are left intact.
    pub fn write_all(
        &self,
        adverts: &[Advert],
        config: &AggregationConfig,
        frequencies: &[Frequency],
        now: DateTime<Utc>,
    ) -> Result<SummaryManifest> {
        let resampler = Resampler::new(config.clone())?;
        let selected = resampler.select(adverts, now);

        ensure_dir(self.layout.data_dir())?;
        let staging = self
            .layout
            .data_dir()
            .join(format!(".summary-{}", Uuid::new_v4().simple()));
        ensure_dir(&staging)?;

        let result = self.write_set(&staging, &resampler, &selected, frequencies, now);
        let manifest = match result {
            Ok(manifest) => manifest,
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            }
        };

        self.swap_in(&staging)?;
        info!(
            full_rows = manifest.full_rows,
            frequencies = manifest.frequencies.len(),
            "summaries written"
        );
        Ok(manifest)
    }

    fn write_set(
        &self,
        dir: &Path,
        resampler: &Resampler,
        selected: &[Advert],
        frequencies: &[Frequency],
        now: DateTime<Utc>,
    ) -> Result<SummaryManifest> {
        let full = dir.join(FULL_FILE);
        self.formatter
            .write_adverts(selected, create(&full)?)
            .map_err(|e| StoreError::Format {
                path: full.clone(),
                source: e,
            })?;

        let mut counts: Vec<(Frequency, usize)> = Vec::with_capacity(frequencies.len());
        for &frequency in frequencies {
            if counts.iter().any(|(f, _)| *f == frequency) {
                continue;
            }
            let buckets = resampler.resample_at(selected, frequency);
            let path = dir.join(StoreLayout::buckets_file_name(frequency));
            self.formatter
                .write_buckets(&buckets, create(&path)?)
                .map_err(|e| StoreError::Format {
                    path: path.clone(),
                    source: e,
                })?;
            debug!(%frequency, buckets = buckets.len(), "summary computed");
            counts.push((frequency, buckets.len()));
        }

        let manifest = SummaryManifest {
            config: resampler.config().clone(),
            generated_at: now,
            full_rows: selected.len(),
            frequencies: counts,
        };
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| StoreError::Manifest {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, json).map_err(|e| StoreError::WriteFile { path, source: e })?;
        Ok(manifest)
    }

    /// Replaces the summary directory with `staging`.
    fn swap_in(&self, staging: &Path) -> Result<()> {
        let target = self.layout.summary_dir();
        let retired = self
            .layout
            .data_dir()
            .join(format!(".summary-old-{}", Uuid::new_v4().simple()));

        if target.exists() {
            fs::rename(&target, &retired).map_err(|e| StoreError::WriteFile {
                path: target.clone(),
                source: e,
            })?;
        }
        if let Err(e) = fs::rename(staging, &target) {
            if retired.exists()
                && let Err(restore) = fs::rename(&retired, &target)
            {
                warn!(path = %retired.display(), error = %restore, "previous summary not restored");
            }
            return Err(StoreError::WriteFile {
                path: target,
                source: e,
            });
        }
        if retired.exists()
            && let Err(e) = fs::remove_dir_all(&retired)
        {
            warn!(path = %retired.display(), error = %e, "retired summary left behind");
        }
        Ok(())
    }

    /// Lists stored summary frequencies, finest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the summary directory cannot be read.
    pub fn available(&self) -> Result<Vec<Frequency>> {
        let mut frequencies: Vec<Frequency> =
            list_files(&self.layout.summary_dir(), BUCKETS_PREFIX)?
                .iter()
                .filter_map(|p| p.file_name()?.to_str())
                .filter_map(StoreLayout::frequency_of)
                .collect();
        frequencies.sort_by_key(|f| (f.approx_seconds(), f.label()));
        Ok(frequencies)
    }

    /// Reads the manifest of the current summary set, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest exists but cannot be read or parsed.
    pub fn manifest(&self) -> Result<Option<SummaryManifest>> {
        let path = self.layout.summary_dir().join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Manifest { path, source: e })
    }

    /// Reads every bucket stored for a frequency.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoDataAvailable`] if the frequency is not stored.
    pub fn read_buckets(&self, frequency: Frequency) -> Result<Vec<Bucket>> {
        let path = self
            .layout
            .summary_dir()
            .join(StoreLayout::buckets_file_name(frequency));
        if !path.exists() {
            return Err(StoreError::no_data(format!("no {frequency} summary")));
        }
        let file = open(&path)?;
        self.reader
            .read_buckets(file)
            .map_err(|e| StoreError::Format { path, source: e })
    }

    /// Reads the filtered full-resolution records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoDataAvailable`] if no full artifact is stored.
    pub fn read_full(&self) -> Result<Vec<Advert>> {
        let path = self.layout.summary_dir().join(FULL_FILE);
        if !path.exists() {
            return Err(StoreError::no_data("no full-resolution artifact"));
        }
        let file = open(&path)?;
        self.reader
            .read_adverts(file)
            .map_err(|e| StoreError::Format { path, source: e })
    }

    /// Answers a bucket query.
    ///
    /// Sources are tried in order: the exact stored frequency, on-demand
    /// resampling of the full-resolution artifact, the nearest coarser
    /// stored frequency, then the nearest finer one. Stored summaries are
    /// only used when their estimator satisfies the query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoDataAvailable`] when no source can answer; a
    /// source that answers with zero matching buckets is `Ok` with an empty
    /// list.
    pub fn query(&self, query: &BucketQuery, now: DateTime<Utc>) -> Result<QueryResult> {
        let manifest = self.manifest()?;
        let stored_estimator = manifest
            .as_ref()
            .map(|m| m.config.estimator)
            .unwrap_or_default();
        let estimator_ok = query.estimator.is_none_or(|e| e == stored_estimator);
        let stored = if estimator_ok {
            self.available()?
        } else {
            Vec::new()
        };

        if stored.contains(&query.frequency) {
            return self.answer(query, QuerySource::Summary(query.frequency), now);
        }

        if self.layout.summary_dir().join(FULL_FILE).exists() {
            let estimator = query.estimator.unwrap_or(stored_estimator);
            let volume = manifest.as_ref().map(|m| m.config.volume).unwrap_or_default();
            return self.resample_full(query, estimator, volume, now);
        }

        let requested = query.frequency.approx_seconds();
        let coarser = stored
            .iter()
            .filter(|f| f.approx_seconds() > requested)
            .min_by_key(|f| f.approx_seconds());
        if let Some(frequency) = coarser {
            return self.answer(query, QuerySource::Coarser(*frequency), now);
        }

        let finer = stored
            .iter()
            .filter(|f| f.approx_seconds() < requested)
            .max_by_key(|f| f.approx_seconds());
        if let Some(frequency) = finer {
            return self.answer(query, QuerySource::Finer(*frequency), now);
        }

        Err(StoreError::no_data(format!(
            "no summary can answer a {} query for {}",
            query.frequency, query.asset
        )))
    }

    fn answer(
        &self,
        query: &BucketQuery,
        source: QuerySource,
        now: DateTime<Utc>,
    ) -> Result<QueryResult> {
        let buckets = self
            .read_buckets(source.frequency(query.frequency))?
            .into_iter()
            .filter(|b| query.matches(b, now))
            .collect();
        Ok(QueryResult { source, buckets })
    }

    fn resample_full(
        &self,
        query: &BucketQuery,
        estimator: EstimatorMode,
        volume: VolumeAgg,
        now: DateTime<Utc>,
    ) -> Result<QueryResult> {
        let mut config = AggregationConfig::new(query.frequency)
            .with_estimator(estimator)
            .with_volume(volume)
            .with_outlier_filter(false);
        config.directions.clone_from(&query.directions);

        let adverts: Vec<Advert> = self
            .read_full()?
            .into_iter()
            .filter(|a| a.asset == query.asset)
            .collect();
        let buckets = Resampler::new(config)?
            .run(&adverts, now)
            .into_iter()
            .filter(|b| query.matches(b, now))
            .collect();
        Ok(QueryResult {
            source: QuerySource::Resampled,
            buckets,
        })
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| StoreError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
}

fn open(path: &PathBuf) -> Result<File> {
    File::open(path).map_err(|e| StoreError::ReadFile {
        path: path.clone(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cambista_aggregate::BetaPolicy;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, hour, minute, 0).unwrap()
    }

    fn adverts() -> Vec<Advert> {
        let sell = |id: &str, ts, price, qty| {
            Advert::new(id, Direction::Sell, "USDT", "BOB", price, ts).with_quantity(qty)
        };
        vec![
            sell("a", at(10, 0), 100.0, 5.0),
            sell("b", at(10, 20), 110.0, 3.0),
            sell("c", at(11, 5), 90.0, 8.0),
            Advert::new("d", Direction::Buy, "USDT", "BOB", 95.0, at(10, 40)).with_quantity(1.0),
        ]
    }

    fn store(temp_dir: &TempDir) -> SummaryStore {
        SummaryStore::new(StoreLayout::new(temp_dir.path()))
    }

    #[test]
    fn test_write_and_query_exact() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let manifest = store
            .write_all(
                &adverts(),
                &AggregationConfig::default(),
                &[Frequency::Hour1, Frequency::Day1],
                at(12, 0),
            )
            .unwrap();
        assert_eq!(manifest.full_rows, 4);
        assert_eq!(store.available().unwrap(), vec![Frequency::Hour1, Frequency::Day1]);

        let query = BucketQuery::new("USDT", Frequency::Hour1).with_directions([Direction::Sell]);
        let result = store.query(&query, at(12, 0)).unwrap();
        assert_eq!(result.source, QuerySource::Summary(Frequency::Hour1));
        assert_eq!(result.buckets.len(), 2);
        assert_relative_eq!(result.buckets[0].open, 105.0);
        assert_relative_eq!(result.buckets[0].volume.unwrap(), 4.0);
    }

    #[test]
    fn test_missing_frequency_resampled_from_full() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .write_all(&adverts(), &AggregationConfig::default(), &[Frequency::Day1], at(12, 0))
            .unwrap();

        let query = BucketQuery::new("USDT", Frequency::Minute15);
        let result = store.query(&query, at(12, 0)).unwrap();
        assert_eq!(result.source, QuerySource::Resampled);
        assert_eq!(result.buckets.len(), 4);
    }

    #[test]
    fn test_fallback_prefers_coarser_then_finer() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .write_all(
                &adverts(),
                &AggregationConfig::default(),
                &[Frequency::Hour1, Frequency::Day1],
                at(12, 0),
            )
            .unwrap();
        fs::remove_file(store.layout().summary_dir().join(FULL_FILE)).unwrap();

        let coarser = store
            .query(&BucketQuery::new("USDT", Frequency::Minute30), at(12, 0))
            .unwrap();
        assert_eq!(coarser.source, QuerySource::Coarser(Frequency::Hour1));
        assert!(coarser.source.is_fallback());

        let finer = store
            .query(&BucketQuery::new("USDT", Frequency::Week1), at(12, 0))
            .unwrap();
        assert_eq!(finer.source, QuerySource::Finer(Frequency::Day1));
        assert_eq!(finer.buckets.len(), 2);
    }

    #[test]
    fn test_only_hourly_summary_answers_five_minutes() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .write_all(&adverts(), &AggregationConfig::default(), &[Frequency::Hour1], at(12, 0))
            .unwrap();
        let summary_dir = store.layout().summary_dir();
        fs::remove_file(summary_dir.join(FULL_FILE)).unwrap();
        fs::remove_file(summary_dir.join(MANIFEST_FILE)).unwrap();

        let result = store
            .query(&BucketQuery::new("USDT", Frequency::Minute5), at(12, 0))
            .unwrap();
        assert_eq!(result.source, QuerySource::Coarser(Frequency::Hour1));
        assert_eq!(result.buckets.len(), 3);
        assert!(result.buckets.iter().all(|b| b.frequency == Frequency::Hour1));
    }

    #[test]
    fn test_no_data_versus_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let query = BucketQuery::new("USDT", Frequency::Hour1);
        assert!(store.query(&query, at(12, 0)).unwrap_err().is_no_data());

        store
            .write_all(&adverts(), &AggregationConfig::default(), &[Frequency::Hour1], at(12, 0))
            .unwrap();
        let result = store
            .query(&BucketQuery::new("BTC", Frequency::Hour1), at(12, 0))
            .unwrap();
        assert!(result.buckets.is_empty());
    }

    #[test]
    fn test_write_replaces_previous_set() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let config = AggregationConfig::default();
        store
            .write_all(&adverts(), &config, &[Frequency::Hour1, Frequency::Day1], at(12, 0))
            .unwrap();
        store
            .write_all(&adverts(), &config, &[Frequency::Minute5], at(12, 0))
            .unwrap();

        assert_eq!(store.available().unwrap(), vec![Frequency::Minute5]);
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".summary"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_swap_keeps_previous_set() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .write_all(&adverts(), &AggregationConfig::default(), &[Frequency::Hour1], at(12, 0))
            .unwrap();

        let missing = temp_dir.path().join(".summary-staging-gone");
        assert!(store.swap_in(&missing).is_err());

        assert_eq!(store.available().unwrap(), vec![Frequency::Hour1]);
        assert!(store.manifest().unwrap().is_some());
        let query = BucketQuery::new("USDT", Frequency::Hour1).with_directions([Direction::Sell]);
        let result = store.query(&query, at(12, 0)).unwrap();
        assert_eq!(result.source, QuerySource::Summary(Frequency::Hour1));
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".summary-old"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_estimator_mismatch_skips_stored_summaries() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .write_all(&adverts(), &AggregationConfig::default(), &[Frequency::Hour1], at(12, 0))
            .unwrap();

        let weighted = EstimatorMode::Weighted(BetaPolicy::default());
        let query = BucketQuery::new("USDT", Frequency::Hour1)
            .with_directions([Direction::Sell])
            .with_estimator(weighted);
        let result = store.query(&query, at(12, 0)).unwrap();
        assert_eq!(result.source, QuerySource::Resampled);
        assert_relative_eq!(result.buckets[0].open, 100.0);

        fs::remove_file(store.layout().summary_dir().join(FULL_FILE)).unwrap();
        assert!(store.query(&query, at(12, 0)).unwrap_err().is_no_data());
    }

    #[test]
    fn test_time_range_on_bucket_start() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .write_all(&adverts(), &AggregationConfig::default(), &[Frequency::Hour1], at(12, 0))
            .unwrap();

        let range = TimeRange::between(at(11, 0), at(12, 0)).unwrap();
        let query = BucketQuery::new("USDT", Frequency::Hour1).with_time_range(range);
        let result = store.query(&query, at(12, 0)).unwrap();
        assert_eq!(result.buckets.len(), 1);
        assert_eq!(result.buckets[0].interval_start, at(11, 0));
    }
}
