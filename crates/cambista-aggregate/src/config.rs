//! Aggregation parameters.

use std::collections::BTreeSet;

use cambista_types::{Direction, Frequency, TimeRange};
use serde::{Deserialize, Serialize};

use crate::BetaPolicy;

/// How the representative close of a bucket is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EstimatorMode {
    /// open = mean, close = median.
    #[default]
    Naive,
    /// open = first price, close = Beta-weighted price.
    Weighted(BetaPolicy),
}

impl EstimatorMode {
    /// Returns true for the Beta-weighted estimator.
    #[must_use]
    pub const fn is_weighted(&self) -> bool {
        matches!(self, Self::Weighted(_))
    }
}

/// How tradable quantities are folded into a bucket volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolumeAgg {
    /// Average quantity per observation.
    #[default]
    Mean,
    /// Total quantity.
    Sum,
}

/// Configuration for one resampling pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Bucket width.
    pub frequency: Frequency,
    /// Directions to keep; `None` keeps every direction.
    pub directions: Option<BTreeSet<Direction>>,
    /// Window of observations to aggregate.
    pub time_range: TimeRange,
    /// Open/close estimator.
    pub estimator: EstimatorMode,
    /// Whether to drop IQR outliers before bucketing.
    pub outlier_filter: bool,
    /// Volume aggregation.
    pub volume: VolumeAgg,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            frequency: Frequency::default(),
            directions: None,
            time_range: TimeRange::default(),
            estimator: EstimatorMode::default(),
            outlier_filter: true,
            volume: VolumeAgg::default(),
        }
    }
}

impl AggregationConfig {
    /// Creates a configuration with the given frequency and defaults elsewhere.
    #[must_use]
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            ..Self::default()
        }
    }

    /// Sets the bucket width.
    #[must_use]
    pub const fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// Sets the time window.
    #[must_use]
    pub const fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    /// Sets the estimator.
    #[must_use]
    pub const fn with_estimator(mut self, estimator: EstimatorMode) -> Self {
        self.estimator = estimator;
        self
    }

    /// Enables or disables the outlier filter.
    #[must_use]
    pub const fn with_outlier_filter(mut self, enabled: bool) -> Self {
        self.outlier_filter = enabled;
        self
    }

    /// Sets the volume aggregation.
    #[must_use]
    pub const fn with_volume(mut self, volume: VolumeAgg) -> Self {
        self.volume = volume;
        self
    }

    /// Restricts aggregation to the given directions.
    #[must_use]
    pub fn with_directions(mut self, directions: impl IntoIterator<Item = Direction>) -> Self {
        self.directions = Some(directions.into_iter().collect());
        self
    }

    /// Returns true if the direction passes the direction filter.
    #[must_use]
    pub fn accepts(&self, direction: &Direction) -> bool {
        self.directions
            .as_ref()
            .is_none_or(|set| set.contains(direction))
    }
}
