//! Peer-to-peer exchange-rate pipeline.
//!
//! This is a facade crate that re-exports functionality from the cambista
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use cambista_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = P2pClient::with_defaults()?;
//!     let now = chrono::Utc::now();
//!     let outcomes = collect_all(&client, &CollectorConfig::default(), now, |_| {}).await;
//!
//!     let records = outcomes.into_iter().flat_map(|o| o.records).collect::<Vec<_>>();
//!     let batch = normalize(&records);
//!
//!     let layout = StoreLayout::with_default_path();
//!     RawStore::new(layout.clone()).append_run(&batch.adverts, now)?;
//!     SummaryStore::new(layout).write_all(
//!         &batch.adverts,
//!         &AggregationConfig::default(),
//!         Frequency::standard(),
//!         now,
//!     )?;
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cambista/cambista/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use cambista_types::*;

// Re-export collection and normalization
#[cfg(feature = "fetch")]
pub use cambista_fetch::{
    ClientConfig, CollectError, CollectOutcome, CollectorConfig, NormalizedBatch, P2pClient,
    RawRecord, SearchRequest, Triple, collect, collect_all, normalize,
};

// Re-export aggregation
#[cfg(feature = "aggregate")]
pub use cambista_aggregate::{
    AggregateError, AggregationConfig, BetaPolicy, Bucket, EstimatorMode, Metric, Resampler,
    VolumeAgg, by_direction, filter_outliers, latest_close,
};

// Re-export formatters
#[cfg(feature = "format")]
pub use cambista_format::{CsvFormatter, FormatError, Formatter, JsonFormatter, OutputFormat};

#[cfg(feature = "parquet")]
pub use cambista_format::{ParquetFormatter, ParquetReader};

// Re-export stores
#[cfg(feature = "store")]
pub use cambista_store::{
    BucketQuery, CacheConfig, DatasetCache, DatasetVersion, QueryResult, QuerySource, RawStore,
    RunFile, StoreError, StoreLayout, SummaryManifest, SummaryStore,
};

/// Prelude module for convenient imports.
///
/// ```
/// use cambista_lib::prelude::*;
/// ```
pub mod prelude {
    pub use cambista_types::{
        Advert, Column, ColumnSet, Direction, Frequency, MarketKey, TimeRange,
    };

    #[cfg(feature = "fetch")]
    pub use cambista_fetch::{
        ClientConfig, CollectOutcome, CollectorConfig, P2pClient, collect_all, normalize,
    };

    #[cfg(feature = "aggregate")]
    pub use cambista_aggregate::{
        AggregationConfig, BetaPolicy, Bucket, EstimatorMode, Resampler, latest_close,
    };

    #[cfg(feature = "format")]
    pub use cambista_format::{CsvFormatter, Formatter, JsonFormatter, OutputFormat};

    #[cfg(feature = "parquet")]
    pub use cambista_format::ParquetFormatter;

    #[cfg(feature = "store")]
    pub use cambista_store::{
        BucketQuery, DatasetCache, QuerySource, RawStore, StoreLayout, SummaryStore,
    };
}
