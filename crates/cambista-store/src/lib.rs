//! Persistence for cambista.
//!
//! - [`RawStore`] - Append-only Parquet files, one per ingestion run
//! - [`SummaryStore`] - Precomputed buckets per frequency and the query interface
//! - [`DatasetCache`] - Caller-owned cache keyed by dataset version and TTL window
//! - [`StoreLayout`] - Directory layout under the data directory

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cambista/cambista/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod error;
mod layout;
mod raw;
mod summary;

pub use cache::{CacheConfig, CacheKey, DEFAULT_TTL_SECS, DatasetCache};
pub use error::{Result, StoreError};
pub use layout::{BUCKETS_PREFIX, EXTENSION, FULL_FILE, MANIFEST_FILE, RUN_PREFIX, StoreLayout};
pub use raw::{DatasetVersion, RawStore, RunFile};
pub use summary::{BucketQuery, QueryResult, QuerySource, SummaryManifest, SummaryStore};
