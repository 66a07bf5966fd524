//! Aggregated interval data structure.

use cambista_types::{Direction, Frequency, MarketKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fixed-width interval's summary for one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Left-closed interval start.
    pub interval_start: DateTime<Utc>,
    /// Bucket width this row was computed at.
    pub frequency: Frequency,
    /// Traded asset symbol.
    pub asset: String,
    /// Settlement currency code.
    pub fiat_unit: String,
    /// Sell or buy side.
    pub direction: Direction,
    /// Mean price (naive) or first observed price (weighted).
    pub open: f64,
    /// Highest price in the interval.
    pub high: f64,
    /// Lowest price in the interval.
    pub low: f64,
    /// Median price (naive) or Beta-weighted price (weighted).
    ///
    /// `None` only in weighted mode when every weight is zero; callers must
    /// treat it as "no data", never as zero.
    pub close: Option<f64>,
    /// Mean or sum of tradable quantity; `None` when quantities are missing.
    pub volume: Option<f64>,
    /// Number of distinct advertisement observations.
    pub num_ads: u32,
    /// Summed upstream transaction count, when every observation has one.
    pub num_transactions: Option<u64>,
}

impl Bucket {
    /// Returns the market this bucket belongs to.
    #[must_use]
    pub fn market(&self) -> MarketKey {
        MarketKey::new(&self.asset, &self.fiat_unit, self.direction.clone())
    }

    /// Returns the exclusive end of the interval.
    #[must_use]
    pub fn interval_end(&self) -> DateTime<Utc> {
        self.frequency.next(self.interval_start)
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if the representative close sits above the open.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close.is_some_and(|c| c > self.open)
    }

    /// Returns true if the representative close sits below the open.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close.is_some_and(|c| c < self.open)
    }
}

/// Returns the last defined close for a direction, the "last price" shown
/// next to a chart.
#[must_use]
pub fn latest_close(buckets: &[Bucket], direction: &Direction) -> Option<f64> {
    buckets
        .iter()
        .filter(|b| &b.direction == direction && b.close.is_some())
        .max_by_key(|b| b.interval_start)
        .and_then(|b| b.close)
}
