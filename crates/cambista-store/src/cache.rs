//! Caller-owned dataset cache with TTL windows and version invalidation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::DatasetVersion;

/// Default time-to-live of a cached dataset, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 1800;

/// Cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Width of one TTL window in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

/// Key under which a dataset is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Fingerprint of the underlying files.
    pub version: DatasetVersion,
    /// `floor(now / ttl)`.
    pub window: i64,
}

/// Single-entry cache for an expensive load.
///
/// An entry is reused only while both the dataset version and the TTL window
/// are unchanged. There is no global state: each caller owns its cache.
#[derive(Debug)]
pub struct DatasetCache<T> {
    config: CacheConfig,
    entry: Option<(CacheKey, Arc<T>)>,
}

impl<T> DatasetCache<T> {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entry: None,
        }
    }

    /// Returns the key a lookup at `now` would use.
    #[must_use]
    pub fn key(&self, version: DatasetVersion, now: DateTime<Utc>) -> CacheKey {
        let ttl = i64::try_from(self.config.ttl_secs.max(1)).unwrap_or(i64::MAX);
        CacheKey {
            version,
            window: now.timestamp().div_euclid(ttl),
        }
    }

    /// Returns the cached value for the key, loading it on a miss.
    ///
    /// A failed load leaves the previous entry untouched.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error.
    pub fn get_or_load<E>(
        &mut self,
        version: DatasetVersion,
        now: DateTime<Utc>,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        let key = self.key(version, now);
        if let Some((cached, value)) = &self.entry
            && *cached == key
        {
            return Ok(Arc::clone(value));
        }
        self.store(key, load)
    }

    /// Reloads unconditionally.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error.
    pub fn refresh<E>(
        &mut self,
        version: DatasetVersion,
        now: DateTime<Utc>,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        let key = self.key(version, now);
        self.store(key, load)
    }

    /// Drops the cached entry.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Returns true if an entry is held.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.entry.is_some()
    }

    fn store<E>(&mut self, key: CacheKey, load: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        let value = Arc::new(load()?);
        self.entry = Some((key, Arc::clone(&value)));
        Ok(value)
    }
}

impl<T> Default for DatasetCache<T> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
