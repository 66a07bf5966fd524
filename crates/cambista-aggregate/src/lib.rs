//! Outlier filtering and resampling for cambista.
//!
//! This crate turns raw advertisement snapshots into per-market buckets:
//!
//! - [`filter_outliers`] - Per-market interquartile-range fence
//! - [`Resampler`] - Batch bucketing with naive or Beta-weighted estimators
//! - [`Bucket`] - One interval's summary for one market
//! - [`AggregationConfig`] - Frequency, window, estimator and volume options

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cambista/cambista/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bucket;
mod config;
mod error;
mod metric;
mod outlier;
mod resample;
mod stats;
mod weighting;

pub use bucket::{Bucket, latest_close};
pub use config::{AggregationConfig, EstimatorMode, VolumeAgg};
pub use error::AggregateError;
pub use metric::Metric;
pub use outlier::{IQR_MULTIPLIER, IqrFence, MIN_OBSERVATIONS, filter_outliers, quartiles};
pub use resample::{Resampler, by_direction};
pub use weighting::{BetaPolicy, PriceWeigher};
