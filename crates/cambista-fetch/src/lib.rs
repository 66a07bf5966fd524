//! Marketplace collection and schema normalization for cambista.
//!
//! This crate provides the ingestion pipeline:
//!
//! - [`P2pClient`] - HTTP client for the advertisement search endpoint
//! - [`collect`] / [`collect_all`] - Sequential pagination per market triple
//! - [`flatten`] - Nested JSON to dot-separated flat records
//! - [`normalize`] - Flat records to typed [`cambista_types::Advert`]s

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/cambista/cambista/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod collector;
mod error;
mod flatten;
mod normalize;

pub use client::{ClientConfig, DEFAULT_BASE_URL, P2pClient, SearchRequest};
pub use collector::{CollectOutcome, CollectorConfig, Triple, collect, collect_all, stamp};
pub use error::CollectError;
pub use flatten::{RawRecord, flatten};
pub use normalize::{NormalizedBatch, canonical_key, normalize, normalize_record};
