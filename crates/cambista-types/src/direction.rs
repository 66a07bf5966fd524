//! Trade direction of an advertisement.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Whether an advertisement offers to sell or to buy the asset.
///
/// Unknown upstream values are kept verbatim in [`Direction::Other`] rather
/// than rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    /// Sell-side offer.
    Sell,
    /// Buy-side offer.
    Buy,
    /// Any other upstream value, passed through unchanged.
    Other(String),
}

impl Direction {
    /// Returns the upstream string for this direction.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sell => "SELL",
            Self::Buy => "BUY",
            Self::Other(s) => s,
        }
    }

    /// Returns the two well-known directions.
    #[must_use]
    pub fn both() -> [Self; 2] {
        [Self::Sell, Self::Buy]
    }

    /// Returns true for [`Direction::Sell`].
    #[must_use]
    pub const fn is_sell(&self) -> bool {
        matches!(self, Self::Sell)
    }

    /// Returns true for [`Direction::Buy`].
    #[must_use]
    pub const fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Direction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "SELL" => Self::Sell,
            "BUY" => Self::Buy,
            _ => Self::Other(s.to_string()),
        })
    }
}

impl From<&str> for Direction {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(direction) => direction,
            Err(never) => match never {},
        }
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}
