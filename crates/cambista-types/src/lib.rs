//! Core types for the cambista P2P exchange-rate pipeline.
//!
//! This crate provides the fundamental data structures used throughout cambista:
//!
//! - [`Advert`] - One advertisement snapshot with typed optional fields
//! - [`Column`] / [`ColumnSet`] - Canonical columns and per-dataset presence
//! - [`Direction`] - Sell or buy side, with pass-through for unknown values
//! - [`MarketKey`] - The (asset, fiat, direction) grouping key
//! - [`Frequency`] - Resampling bucket width
//! - [`TimeRange`] - Window of observations to consider

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cambista/cambista/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod advert;
mod direction;
mod error;
mod frequency;
mod market;
mod time_range;

pub use advert::{Advert, Column, ColumnSet};
pub use direction::Direction;
pub use error::{FrequencyParseError, TimeRangeError};
pub use frequency::Frequency;
pub use market::MarketKey;
pub use time_range::TimeRange;
