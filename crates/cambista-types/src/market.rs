//! Market identity: the (asset, fiat, direction) grouping key.

use serde::{Deserialize, Serialize};

use crate::Direction;

/// Identifies one side of one asset/fiat market.
///
/// Prices are only comparable within a key, so outlier filtering and
/// resampling never mix keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketKey {
    /// Traded asset symbol.
    asset: String,
    /// Settlement currency code.
    fiat_unit: String,
    /// Sell or buy side.
    direction: Direction,
}

impl MarketKey {
    /// Creates a new market key.
    #[must_use]
    pub fn new(asset: impl Into<String>, fiat_unit: impl Into<String>, direction: Direction) -> Self {
        Self {
            asset: asset.into(),
            fiat_unit: fiat_unit.into(),
            direction,
        }
    }

    /// Returns the asset symbol.
    #[must_use]
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Returns the fiat currency code.
    #[must_use]
    pub fn fiat_unit(&self) -> &str {
        &self.fiat_unit
    }

    /// Returns the direction.
    #[must_use]
    pub const fn direction(&self) -> &Direction {
        &self.direction
    }
}

impl std::fmt::Display for MarketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} {}", self.asset, self.fiat_unit, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let key = MarketKey::new("USDT", "BOB", Direction::Sell);
        assert_eq!(key.to_string(), "USDT/BOB SELL");
        assert_eq!(key.asset(), "USDT");
        assert_eq!(key.fiat_unit(), "BOB");
    }

    #[test]
    fn test_ordering_groups_by_asset_first() {
        let a = MarketKey::new("BTC", "BOB", Direction::Sell);
        let b = MarketKey::new("USDT", "BOB", Direction::Buy);
        assert!(a < b);
    }
}
