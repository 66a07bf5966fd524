//! Interquartile-range outlier filter.

use std::collections::HashMap;

use cambista_types::{Advert, MarketKey};
use tracing::debug;

use crate::stats::{quantile_sorted, sorted};

/// Fence width in multiples of the interquartile range.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Groups with fewer observations than this admit everything.
pub const MIN_OBSERVATIONS: usize = 4;

/// Admissible price interval, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrFence {
    /// Lowest admissible price.
    pub lower: f64,
    /// Highest admissible price.
    pub upper: f64,
}

impl IqrFence {
    /// Builds the fence for one group of prices.
    ///
    /// With fewer than [`MIN_OBSERVATIONS`] prices the fence degenerates to
    /// `[min, max]`. Returns `None` for an empty group.
    #[must_use]
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        let sorted = sorted(prices);
        let (first, last) = (*sorted.first()?, *sorted.last()?);
        if sorted.len() < MIN_OBSERVATIONS {
            return Some(Self {
                lower: first,
                upper: last,
            });
        }
        let (q1, q3) = quartiles_sorted(&sorted)?;
        let iqr = q3 - q1;
        Some(Self {
            lower: q1 - IQR_MULTIPLIER * iqr,
            upper: q3 + IQR_MULTIPLIER * iqr,
        })
    }

    /// Returns true if the price lies inside the fence.
    #[must_use]
    pub fn admits(&self, price: f64) -> bool {
        self.lower <= price && price <= self.upper
    }
}

/// First and third quartiles of unordered prices, by linear interpolation.
#[must_use]
pub fn quartiles(prices: &[f64]) -> Option<(f64, f64)> {
    quartiles_sorted(&sorted(prices))
}

fn quartiles_sorted(sorted: &[f64]) -> Option<(f64, f64)> {
    Some((quantile_sorted(sorted, 0.25)?, quantile_sorted(sorted, 0.75)?))
}

/// Drops adverts whose price falls outside their group's fence.
///
/// Fences are computed independently per [`MarketKey`]; the relative order of
/// the surviving adverts is preserved.
#[must_use]
pub fn filter_outliers(adverts: Vec<Advert>) -> Vec<Advert> {
    let mut groups: HashMap<MarketKey, Vec<f64>> = HashMap::new();
    for advert in &adverts {
        groups.entry(advert.market()).or_default().push(advert.price);
    }

    let fences: HashMap<MarketKey, IqrFence> = groups
        .into_iter()
        .filter_map(|(key, prices)| IqrFence::from_prices(&prices).map(|fence| (key, fence)))
        .collect();

    let before = adverts.len();
    let kept: Vec<Advert> = adverts
        .into_iter()
        .filter(|a| fences.get(&a.market()).is_some_and(|f| f.admits(a.price)))
        .collect();

    debug!(
        removed = before - kept.len(),
        kept = kept.len(),
        groups = fences.len(),
        "outlier filter applied"
    );
    kept
}
