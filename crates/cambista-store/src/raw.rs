//! Append-only store of raw ingestion runs.

use cambista_format::{Formatter, ParquetFormatter, ParquetReader};
use cambista_types::Advert;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::layout::{RUN_PREFIX, ensure_dir, list_files};
use crate::{DatasetCache, Result, StoreError, StoreLayout};

/// Fingerprint of the raw record set.
///
/// Changes whenever a run file is added, removed or rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DatasetVersion {
    /// Number of run files.
    pub files: usize,
    /// Total size of the run files in bytes.
    pub bytes: u64,
    /// Most recent modification time.
    pub newest: Option<SystemTime>,
}

/// One stored ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFile {
    /// Path of the run file.
    pub path: PathBuf,
    /// File size in bytes.
    pub bytes: u64,
    /// Last modification time.
    pub modified: Option<SystemTime>,
}

/// Raw record store: one Parquet file per ingestion run.
#[derive(Debug, Clone)]
pub struct RawStore {
    layout: StoreLayout,
    formatter: ParquetFormatter,
    reader: ParquetReader,
}

impl RawStore {
    /// Creates a raw store over the given layout.
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

    /// Writes one run to a new file and returns its path.
    ///
    /// The file is written under a temporary name and renamed into place, so
    /// readers never observe a partial run.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot
    /// be written.
    pub fn append_run(&self, adverts: &[Advert], run_time: DateTime<Utc>) -> Result<PathBuf> {
        let dir = self.layout.raw_dir();
        ensure_dir(&dir)?;

        let id = Uuid::new_v4().simple().to_string();
        let name = StoreLayout::run_file_name(run_time, &id[..8]);
        let path = dir.join(&name);
        let staging = dir.join(format!(".{name}.tmp"));

        write_staged(&staging, &path, |file| {
            self.formatter
                .write_adverts(adverts, BufWriter::new(file))
                .map_err(|e| StoreError::Format {
                    path: staging.clone(),
                    source: e,
                })
        })?;

        info!(path = %path.display(), records = adverts.len(), "raw run stored");
        Ok(path)
    }

    /// Lists stored runs in name (chronological) order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn runs(&self) -> Result<Vec<RunFile>> {
        list_files(&self.layout.raw_dir(), RUN_PREFIX)?
            .into_iter()
            .map(|path| {
                let meta = fs::metadata(&path).map_err(|e| StoreError::ReadFile {
                    path: path.clone(),
                    source: e,
                })?;
                Ok(RunFile {
                    bytes: meta.len(),
                    modified: meta.modified().ok(),
                    path,
                })
            })
            .collect()
    }

    /// Returns the fingerprint of the current run set.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn version(&self) -> Result<DatasetVersion> {
        let runs = self.runs()?;
        Ok(DatasetVersion {
            files: runs.len(),
            bytes: runs.iter().map(|r| r.bytes).sum(),
            newest: runs.iter().filter_map(|r| r.modified).max(),
        })
    }

    /// Loads every stored run, concatenated in run order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoDataAvailable`] if no run has been stored, or
    /// an error if a run file cannot be read.
    pub fn load_all(&self) -> Result<Vec<Advert>> {
        let runs = self.runs()?;
        if runs.is_empty() {
            return Err(StoreError::no_data(format!(
                "no raw runs in {}",
                self.layout.raw_dir().display()
            )));
        }

        let mut adverts = Vec::new();
        for run in &runs {
            adverts.extend(self.read_run(&run.path)?);
        }
        debug!(runs = runs.len(), records = adverts.len(), "raw runs loaded");
        Ok(adverts)
    }

    /// Loads every stored run through a cache keyed by the dataset version.
    ///
    /// # Errors
    ///
    /// See [`RawStore::load_all`].
    pub fn load_cached(
        &self,
        cache: &mut DatasetCache<Vec<Advert>>,
        now: DateTime<Utc>,
    ) -> Result<Arc<Vec<Advert>>> {
        let version = self.version()?;
        cache.get_or_load(version, now, || self.load_all())
    }

    fn read_run(&self, path: &Path) -> Result<Vec<Advert>> {
        let file = File::open(path).map_err(|e| StoreError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.reader
            .read_adverts(file)
            .map_err(|e| StoreError::Format {
                path: path.to_path_buf(),
                source: e,
            })
    }
}

/// Writes through `staging` and renames it to `path`.
///
/// The staging file is removed if writing or renaming fails.
fn write_staged(
    staging: &Path,
    path: &Path,
    write: impl FnOnce(File) -> Result<()>,
) -> Result<()> {
    let file = File::create(staging).map_err(|e| StoreError::WriteFile {
        path: staging.to_path_buf(),
        source: e,
    })?;
    let written = write(file).and_then(|()| {
        fs::rename(staging, path).map_err(|e| StoreError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    });
    if written.is_err()
        && let Err(e) = fs::remove_file(staging)
    {
        warn!(path = %staging.display(), error = %e, "staging file left behind");
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheConfig;
    use cambista_types::Direction;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn advert(id: &str, hour: u32) -> Advert {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap();
        Advert::new(id, Direction::Sell, "USDT", "BOB", 9.9, ts).with_quantity(10.0)
    }

    fn store(temp_dir: &TempDir) -> RawStore {
        RawStore::new(StoreLayout::new(temp_dir.path()))
    }

    #[test]
    fn test_failed_write_removes_staging_file() {
        let temp_dir = TempDir::new().unwrap();
        let staging = temp_dir.path().join(".run-x.parquet.tmp");
        let path = temp_dir.path().join("run-x.parquet");

        let err = write_staged(&staging, &path, |_| {
            Err(StoreError::WriteFile {
                path: staging.clone(),
                source: std::io::Error::other("disk full"),
            })
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::WriteFile { .. }));
        assert!(!staging.exists());
        assert!(!path.exists());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_store_has_no_data() {
        let temp_dir = TempDir::new().unwrap();
        let err = store(&temp_dir).load_all().unwrap_err();
        assert!(err.is_no_data());
        assert_eq!(store(&temp_dir).version().unwrap(), DatasetVersion::default());
    }

    #[test]
    fn test_append_and_load_in_run_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let first = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        let path = store.append_run(&[advert("b", 11)], second).unwrap();
        store.append_run(&[advert("a", 10)], first).unwrap();

        assert!(path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("run-20240501110000-"));

        let loaded = store.load_all().unwrap();
        let ids: Vec<_> = loaded.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let version = store.version().unwrap();
        assert_eq!(version.files, 2);
        assert!(version.bytes > 0);
    }

    #[test]
    fn test_cached_load_follows_version() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut cache = DatasetCache::new(CacheConfig::default());

        store.append_run(&[advert("a", 10)], now).unwrap();
        assert_eq!(store.load_cached(&mut cache, now).unwrap().len(), 1);

        store.append_run(&[advert("b", 11)], now).unwrap();
        assert_eq!(store.load_cached(&mut cache, now).unwrap().len(), 2);
    }
}
