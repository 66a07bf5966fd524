//! Beta-density weighted price estimator.

use cambista_types::Direction;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Beta, Continuous};

use crate::AggregateError;

/// Distance kept from the ends of `[0, 1]` when evaluating the density.
///
/// Shapes below 1 have an unbounded density at an end point, and the
/// bucket's own low and high always sit exactly there.
const EDGE: f64 = 1e-9;

/// Beta shape parameters per side.
///
/// The defaults are empirically tuned, not derived; treat them as a policy
/// to adjust rather than a fixed law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BetaPolicy {
    /// Alpha shape for sell-side buckets.
    pub sell_alpha: f64,
    /// Beta shape for sell-side buckets.
    pub sell_beta: f64,
    /// Alpha shape for buy-side buckets.
    pub buy_alpha: f64,
    /// Beta shape for buy-side buckets.
    pub buy_beta: f64,
}

impl Default for BetaPolicy {
    fn default() -> Self {
        Self {
            sell_alpha: 1.0,
            sell_beta: 5.5,
            buy_alpha: 5.5,
            buy_beta: 1.0,
        }
    }
}

impl BetaPolicy {
    /// Creates a policy with explicit shapes.
    #[must_use]
    pub const fn new(sell_alpha: f64, sell_beta: f64, buy_alpha: f64, buy_beta: f64) -> Self {
        Self {
            sell_alpha,
            sell_beta,
            buy_alpha,
            buy_beta,
        }
    }

    /// Builds the two distributions, validating the shapes.
    ///
    /// # Errors
    ///
    /// Returns an error if any shape is not strictly positive and finite.
    pub fn build(&self) -> Result<PriceWeigher, AggregateError> {
        Ok(PriceWeigher {
            sell: beta("SELL", self.sell_alpha, self.sell_beta)?,
            buy: beta("BUY", self.buy_alpha, self.buy_beta)?,
        })
    }
}

fn beta(direction: &'static str, alpha: f64, shape_b: f64) -> Result<Beta, AggregateError> {
    let invalid = |reason: String| AggregateError::InvalidBetaShape {
        direction,
        alpha,
        beta: shape_b,
        reason,
    };
    if !(alpha.is_finite() && shape_b.is_finite()) {
        return Err(invalid("shape must be finite".to_string()));
    }
    Beta::new(alpha, shape_b).map_err(|e| invalid(e.to_string()))
}

/// Validated Beta distributions for both sides.
#[derive(Debug, Clone)]
pub struct PriceWeigher {
    sell: Beta,
    buy: Beta,
}

impl PriceWeigher {
    /// Returns the distribution used for a direction.
    ///
    /// Directions other than BUY use the sell-side shape.
    const fn distribution(&self, direction: &Direction) -> &Beta {
        match direction {
            Direction::Buy => &self.buy,
            Direction::Sell | Direction::Other(_) => &self.sell,
        }
    }

    /// Importance-weighted price of `(price, quantity)` observations.
    ///
    /// Each price is normalised into `[0, 1]` over `[low, high]`, kept
    /// `EDGE` away from either end, and weighted by the Beta density at
    /// that point times its quantity. When
    /// `high == low` the constant price is returned. Returns `None` when the
    /// weights sum to zero or are not finite.
    #[must_use]
    pub fn weighted_price(
        &self,
        direction: &Direction,
        observations: &[(f64, f64)],
        low: f64,
        high: f64,
    ) -> Option<f64> {
        if observations.is_empty() {
            return None;
        }
        let span = high - low;
        if span <= 0.0 {
            return Some(low);
        }

        let dist = self.distribution(direction);
        let (num, den) = observations
            .iter()
            .fold((0.0, 0.0), |(num, den), &(price, quantity)| {
                let position = ((price - low) / span).clamp(EDGE, 1.0 - EDGE);
                let weight = dist.pdf(position) * quantity;
                (num + price * weight, den + weight)
            });

        if !(den.is_finite() && den > 0.0) {
            return None;
        }
        let price = num / den;
        price.is_finite().then(|| price.clamp(low, high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn weigher() -> PriceWeigher {
        BetaPolicy::default().build().unwrap()
    }

    #[test]
    fn test_constant_price() {
        let w = weigher();
        let price = w.weighted_price(&Direction::Sell, &[(7.0, 0.0), (7.0, 0.0)], 7.0, 7.0);
        assert_eq!(price, Some(7.0));
    }

    #[test]
    fn test_bounded_by_low_and_high() {
        let w = weigher();
        let obs = [(10.0, 5.0), (10.4, 1.0), (11.0, 20.0), (10.7, 3.0)];
        for direction in [Direction::Sell, Direction::Buy] {
            let price = w.weighted_price(&direction, &obs, 10.0, 11.0).unwrap();
            assert!((10.0..=11.0).contains(&price));
        }
    }

    #[test]
    fn test_sides_lean_towards_opposite_ends() {
        let w = weigher();
        let obs = [(10.0, 1.0), (10.5, 1.0), (11.0, 1.0)];
        let sell = w.weighted_price(&Direction::Sell, &obs, 10.0, 11.0).unwrap();
        let buy = w.weighted_price(&Direction::Buy, &obs, 10.0, 11.0).unwrap();
        assert!(sell < 10.5);
        assert!(buy > 10.5);
    }

    #[test]
    fn test_zero_weights_yield_none() {
        let w = weigher();
        let obs = [(10.0, 0.0), (11.0, 0.0)];
        assert_eq!(w.weighted_price(&Direction::Sell, &obs, 10.0, 11.0), None);
    }

    #[test]
    fn test_sell_weight_at_low_end() {
        // Beta(1, 5.5) has density 5.5 at 0 and 0 at 1: only the low price counts.
        let w = weigher();
        let price = w
            .weighted_price(&Direction::Sell, &[(10.0, 1.0), (11.0, 1.0)], 10.0, 11.0)
            .unwrap();
        assert_relative_eq!(price, 10.0);
    }

    #[test]
    fn test_shapes_below_one_stay_finite() {
        let w = BetaPolicy::new(0.5, 2.0, 2.0, 0.5).build().unwrap();
        let obs = [(100.0, 5.0), (105.0, 5.0), (110.0, 5.0)];
        for direction in [Direction::Sell, Direction::Buy] {
            let price = w.weighted_price(&direction, &obs, 100.0, 110.0).unwrap();
            assert!((100.0..=110.0).contains(&price));
        }
        let sell = w.weighted_price(&Direction::Sell, &obs, 100.0, 110.0).unwrap();
        let buy = w.weighted_price(&Direction::Buy, &obs, 100.0, 110.0).unwrap();
        assert!(sell < 105.0);
        assert!(buy > 105.0);
    }

    #[test]
    fn test_invalid_shape() {
        let policy = BetaPolicy::new(0.0, 1.0, 1.0, 1.0);
        assert!(matches!(
            policy.build(),
            Err(AggregateError::InvalidBetaShape { direction: "SELL", .. })
        ));
        assert!(BetaPolicy::new(1.0, 1.0, 1.0, f64::INFINITY).build().is_err());
    }
}
