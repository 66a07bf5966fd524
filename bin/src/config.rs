//! Configuration loading for the cambista CLI.
//!
//! Reads `cambista.yml` and layers `CAMBISTA__*` environment variables on top.

use anyhow::{Context, Result};
use cambista_lib::{
    AggregationConfig, CacheConfig, ClientConfig, CollectorConfig, Frequency, StoreLayout,
};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "cambista.yml";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    /// P2P search client settings.
    pub(crate) client: ClientConfig,
    /// Which markets to collect.
    pub(crate) collector: CollectorConfig,
    /// Resampling parameters for summaries and queries.
    pub(crate) aggregation: AggregationConfig,
    /// Dataset cache TTL.
    pub(crate) cache: CacheConfig,
    /// Storage location.
    pub(crate) storage: StorageConfig,
    /// Frequencies precomputed by `aggregate`.
    pub(crate) frequencies: Vec<Frequency>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            collector: CollectorConfig::default(),
            aggregation: AggregationConfig::default(),
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            frequencies: Frequency::standard().to_vec(),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StorageConfig {
    /// Data directory; the platform data directory when unset.
    pub(crate) data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Loads configuration from `path`, or from `cambista.yml` if present.
    ///
    /// An explicit path must exist; the default file is optional.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("CAMBISTA").separator("__"))
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Returns the storage layout for the configured data directory.
    pub(crate) fn layout(&self) -> StoreLayout {
        self.storage
            .data_dir
            .as_ref()
            .map_or_else(StoreLayout::with_default_path, StoreLayout::new)
    }

    /// Short description for logging.
    pub(crate) fn digest(&self) -> String {
        format!(
            "fiat={} assets={:?} directions={} estimator={} frequencies={}",
            self.collector.fiat,
            self.collector.assets,
            self.collector.directions.len(),
            if self.aggregation.estimator.is_weighted() {
                "weighted"
            } else {
                "naive"
            },
            self.frequencies.len(),
        )
    }
}
