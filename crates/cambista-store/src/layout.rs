//! On-disk layout of the data directory.

use cambista_types::Frequency;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Result, StoreError};

/// Prefix of raw run files.
pub const RUN_PREFIX: &str = "run-";
/// Prefix of bucket summary files.
pub const BUCKETS_PREFIX: &str = "buckets-";
/// Name of the filtered full-resolution artifact.
pub const FULL_FILE: &str = "full.parquet";
/// Name of the summary manifest.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Extension of every stored data file.
pub const EXTENSION: &str = "parquet";

/// Paths of the raw and summary directories under one data directory.
///
/// ```text
/// <data_dir>/raw/run-<YYYYmmddHHMMSS>-<id>.parquet
/// <data_dir>/summary/buckets-<tag>.parquet
/// <data_dir>/summary/full.parquet
/// <data_dir>/summary/manifest.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    data_dir: PathBuf,
}

impl StoreLayout {
    /// Creates a layout rooted at `data_dir`. Nothing is created on disk.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Returns the default data directory.
    ///
    /// Uses the `directories` crate to find the appropriate location:
    /// - Linux: `~/.local/share/cambista/`
    /// - macOS: `~/Library/Application Support/cambista/`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\cambista\`
    ///
    /// Falls back to `~/.cambista/` if the platform-specific location
    /// cannot be determined.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "cambista").map_or_else(dirs_fallback, |proj_dirs| {
            proj_dirs.data_dir().to_path_buf()
        })
    }

    /// Creates a layout at the default data directory.
    #[must_use]
    pub fn with_default_path() -> Self {
        Self::new(Self::default_path())
    }

    /// Returns the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the raw run directory.
    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    /// Returns the summary directory.
    #[must_use]
    pub fn summary_dir(&self) -> PathBuf {
        self.data_dir.join("summary")
    }

    /// Returns the file name of a run written at `run_time`.
    #[must_use]
    pub fn run_file_name(run_time: DateTime<Utc>, id: &str) -> String {
        format!(
            "{RUN_PREFIX}{}-{id}.{EXTENSION}",
            run_time.format("%Y%m%d%H%M%S")
        )
    }

    /// Returns the file name of the summary for a frequency.
    #[must_use]
    pub fn buckets_file_name(frequency: Frequency) -> String {
        format!("{BUCKETS_PREFIX}{}.{EXTENSION}", frequency.tag())
    }

    /// Parses the frequency back out of a summary file name.
    #[must_use]
    pub fn frequency_of(file_name: &str) -> Option<Frequency> {
        file_name
            .strip_prefix(BUCKETS_PREFIX)?
            .strip_suffix(&format!(".{EXTENSION}"))?
            .parse()
            .ok()
    }
}

/// Creates a directory and its parents if missing.
pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| StoreError::CreateDir {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Lists the files in `dir` whose name starts with `prefix` and ends with the
/// data extension, sorted by name. A missing directory yields an empty list.
pub(crate) fn list_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|e| StoreError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let matches = path.file_name().and_then(|n| n.to_str()).is_some_and(|name| {
            name.starts_with(prefix) && path.extension().is_some_and(|ext| ext == EXTENSION)
        });
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Fallback for determining home directory.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".cambista")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_paths() {
        let layout = StoreLayout::new("/data");
        assert_eq!(layout.raw_dir(), PathBuf::from("/data/raw"));
        assert_eq!(layout.summary_dir(), PathBuf::from("/data/summary"));
    }

    #[test]
    fn test_file_names() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 3, 7).unwrap();
        assert_eq!(
            StoreLayout::run_file_name(ts, "ab12cd34"),
            "run-20240501090307-ab12cd34.parquet"
        );
        assert_eq!(
            StoreLayout::buckets_file_name(Frequency::Day1),
            "buckets-1d.parquet"
        );
        for frequency in Frequency::standard() {
            let name = StoreLayout::buckets_file_name(*frequency);
            assert_eq!(StoreLayout::frequency_of(&name), Some(*frequency));
        }
        assert_eq!(StoreLayout::frequency_of("full.parquet"), None);
    }

    #[test]
    fn test_list_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        assert!(list_files(&dir.join("missing"), RUN_PREFIX).unwrap().is_empty());

        for name in ["run-2.parquet", "run-1.parquet", "other.parquet", "run-3.json"] {
            fs::write(dir.join(name), b"x").unwrap();
        }
        let files = list_files(dir, RUN_PREFIX).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["run-1.parquet", "run-2.parquet"]);
    }
}
