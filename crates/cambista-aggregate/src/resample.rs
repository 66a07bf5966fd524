//! Batch resampling of adverts into per-market buckets.

use std::collections::{BTreeMap, BTreeSet};

use cambista_types::{Advert, Column, Direction, Frequency, MarketKey};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    AggregateError, AggregationConfig, Bucket, EstimatorMode, Metric, VolumeAgg,
    outlier::filter_outliers,
    stats::{mean, median_sorted, sorted},
    weighting::PriceWeigher,
};

/// Resampling engine.
///
/// Buckets are fully recomputed on every call; the same input and
/// configuration always produce identical output.
#[derive(Debug, Clone)]
pub struct Resampler {
    config: AggregationConfig,
    weigher: Option<PriceWeigher>,
}

impl Resampler {
    /// Creates a resampler, validating the estimator parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if a weighted estimator has invalid Beta shapes.
    pub fn new(config: AggregationConfig) -> Result<Self, AggregateError> {
        let weigher = match &config.estimator {
            EstimatorMode::Naive => None,
            EstimatorMode::Weighted(policy) => Some(policy.build()?),
        };
        Ok(Self { config, weigher })
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Keeps the adverts inside the time range and direction filter, then
    /// drops outliers if enabled.
    #[must_use]
    pub fn select(&self, adverts: &[Advert], now: DateTime<Utc>) -> Vec<Advert> {
        let selected: Vec<Advert> = adverts
            .iter()
            .filter(|a| self.config.time_range.contains(a.timestamp, now))
            .filter(|a| self.config.accepts(&a.direction))
            .cloned()
            .collect();
        if self.config.outlier_filter {
            filter_outliers(selected)
        } else {
            selected
        }
    }

    /// Selects and resamples in one step at the configured frequency.
    #[must_use]
    pub fn run(&self, adverts: &[Advert], now: DateTime<Utc>) -> Vec<Bucket> {
        self.resample(&self.select(adverts, now))
    }

    /// Buckets already-selected adverts at the configured frequency.
    #[must_use]
    pub fn resample(&self, adverts: &[Advert]) -> Vec<Bucket> {
        self.resample_at(adverts, self.config.frequency)
    }

    /// Buckets already-selected adverts at an arbitrary frequency.
    ///
    /// Output is ordered by market, then interval start. Empty intervals are
    /// never emitted.
    #[must_use]
    pub fn resample_at(&self, adverts: &[Advert], frequency: Frequency) -> Vec<Bucket> {
        let mut groups: BTreeMap<(MarketKey, DateTime<Utc>), Vec<&Advert>> = BTreeMap::new();
        for advert in adverts {
            let start = frequency.floor(advert.timestamp);
            groups
                .entry((advert.market(), start))
                .or_default()
                .push(advert);
        }

        let buckets: Vec<Bucket> = groups
            .into_iter()
            .filter_map(|((market, start), mut members)| {
                members.sort_by(|a, b| {
                    a.timestamp
                        .cmp(&b.timestamp)
                        .then_with(|| a.price.total_cmp(&b.price))
                        .then_with(|| a.id.cmp(&b.id))
                });
                self.build(&market, start, frequency, &members)
            })
            .collect();

        debug!(
            input = adverts.len(),
            buckets = buckets.len(),
            frequency = %frequency,
            "resampled adverts"
        );
        buckets
    }

    fn build(
        &self,
        market: &MarketKey,
        interval_start: DateTime<Utc>,
        frequency: Frequency,
        members: &[&Advert],
    ) -> Option<Bucket> {
        let first = members.first()?;
        let prices: Vec<f64> = members.iter().map(|a| a.price).collect();
        let ordered = sorted(&prices);
        let low = *ordered.first()?;
        let high = *ordered.last()?;

        let quantities = collect_all(members, Metric::Volume, |a| a.tradable_quantity);

        let (open, close) = match &self.weigher {
            None => (mean(&prices)?, median_sorted(&ordered)),
            Some(weigher) => {
                let close = quantities.as_ref().and_then(|qty| {
                    let observations: Vec<(f64, f64)> =
                        prices.iter().copied().zip(qty.iter().copied()).collect();
                    weigher.weighted_price(market.direction(), &observations, low, high)
                });
                (first.price, close)
            }
        };

        let volume = quantities.and_then(|qty| match self.config.volume {
            VolumeAgg::Mean => mean(&qty),
            VolumeAgg::Sum => Some(qty.iter().sum()),
        });

        let num_transactions = collect_all(members, Metric::Transactions, |a| a.num_transactions)
            .map(|counts| counts.iter().sum());

        let num_ads = members
            .iter()
            .map(|a| (a.id.as_str(), a.timestamp))
            .collect::<BTreeSet<_>>()
            .len();

        Some(Bucket {
            interval_start,
            frequency,
            asset: market.asset().to_string(),
            fiat_unit: market.fiat_unit().to_string(),
            direction: market.direction().clone(),
            open,
            high,
            low,
            close,
            volume,
            num_ads: u32::try_from(num_ads).unwrap_or(u32::MAX),
            num_transactions,
        })
    }
}

/// Gathers a metric's input from every member, or `None` if any member lacks
/// one of the metric's required columns.
fn collect_all<T>(
    members: &[&Advert],
    metric: Metric,
    value: impl Fn(&Advert) -> Option<T>,
) -> Option<Vec<T>> {
    let required: &[Column] = metric.requires();
    if !members.iter().all(|a| required.iter().all(|c| a.has(*c))) {
        return None;
    }
    members.iter().map(|a| value(a)).collect()
}

/// Splits buckets by direction, preserving order.
#[must_use]
pub fn by_direction<'a>(buckets: &'a [Bucket], direction: &Direction) -> Vec<&'a Bucket> {
    buckets.iter().filter(|b| &b.direction == direction).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BetaPolicy;
    use approx::assert_relative_eq;
    use cambista_types::TimeRange;
    use chrono::{TimeDelta, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, hour, minute, 0).unwrap()
    }

    fn sell(id: &str, ts: DateTime<Utc>, price: f64, qty: f64) -> Advert {
        Advert::new(id, Direction::Sell, "USDT", "BOB", price, ts).with_quantity(qty)
    }

    fn scenario() -> Vec<Advert> {
        vec![
            sell("a", at(10, 0), 100.0, 5.0),
            sell("b", at(10, 20), 110.0, 3.0),
            sell("c", at(11, 5), 90.0, 8.0),
        ]
    }

    fn naive(frequency: Frequency) -> Resampler {
        Resampler::new(AggregationConfig::new(frequency)).unwrap()
    }

    #[test]
    fn test_hourly_naive_scenario() {
        let buckets = naive(Frequency::Hour1).run(&scenario(), at(12, 0));
        assert_eq!(buckets.len(), 2);

        let first = &buckets[0];
        assert_eq!(first.interval_start, at(10, 0));
        assert_relative_eq!(first.open, 105.0);
        assert_relative_eq!(first.high, 110.0);
        assert_relative_eq!(first.low, 100.0);
        assert_relative_eq!(first.close.unwrap(), 105.0);
        assert_relative_eq!(first.volume.unwrap(), 4.0);
        assert_eq!(first.num_ads, 2);

        let second = &buckets[1];
        assert_eq!(second.interval_start, at(11, 0));
        assert_relative_eq!(second.open, 90.0);
        assert_relative_eq!(second.high, 90.0);
        assert_relative_eq!(second.low, 90.0);
        assert_relative_eq!(second.close.unwrap(), 90.0);
        assert_relative_eq!(second.volume.unwrap(), 8.0);
    }

    #[test]
    fn test_rerun_is_identical() {
        let resampler = Resampler::new(
            AggregationConfig::new(Frequency::Minute15)
                .with_estimator(EstimatorMode::Weighted(BetaPolicy::default())),
        )
        .unwrap();
        let mut adverts = scenario();
        let first = resampler.run(&adverts, at(12, 0));
        adverts.reverse();
        let second = resampler.run(&adverts, at(12, 0));
        assert_eq!(first, second);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.open.to_bits(), b.open.to_bits());
            assert_eq!(a.close.map(f64::to_bits), b.close.map(f64::to_bits));
        }
    }

    #[test]
    fn test_boundary_belongs_to_later_bucket() {
        let adverts = vec![
            sell("a", at(10, 59) + TimeDelta::seconds(59), 100.0, 1.0),
            sell("b", at(11, 0), 120.0, 1.0),
        ];
        let buckets = naive(Frequency::Hour1).run(&adverts, at(12, 0));
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[1].interval_start, at(11, 0));
        assert_relative_eq!(buckets[1].open, 120.0);
    }

    #[test]
    fn test_empty_intervals_are_omitted() {
        let adverts = vec![sell("a", at(1, 0), 100.0, 1.0), sell("b", at(9, 0), 101.0, 1.0)];
        let buckets = naive(Frequency::Hour1).run(&adverts, at(12, 0));
        assert_eq!(buckets.len(), 2);
        assert!(naive(Frequency::Hour1).run(&[], at(12, 0)).is_empty());
    }

    #[test]
    fn test_weighted_close_within_bounds() {
        let resampler = Resampler::new(
            AggregationConfig::new(Frequency::Hour1)
                .with_estimator(EstimatorMode::Weighted(BetaPolicy::default())),
        )
        .unwrap();
        let buckets = resampler.run(&scenario(), at(12, 0));
        let first = &buckets[0];
        assert_relative_eq!(first.open, 100.0);
        let close = first.close.unwrap();
        assert!(first.low <= close && close <= first.high);
        assert_relative_eq!(buckets[1].close.unwrap(), 90.0);
    }

    #[test]
    fn test_weighted_close_with_unbounded_density() {
        let policy = BetaPolicy::new(0.5, 2.0, 2.0, 0.5);
        let resampler = Resampler::new(
            AggregationConfig::new(Frequency::Hour1)
                .with_estimator(EstimatorMode::Weighted(policy)),
        )
        .unwrap();
        let adverts = [
            sell("a", at(10, 0), 100.0, 5.0),
            sell("b", at(10, 10), 105.0, 5.0),
            sell("c", at(10, 20), 110.0, 5.0),
        ];
        let buckets = resampler.run(&adverts, at(12, 0));
        assert_eq!(buckets.len(), 1);
        let close = buckets[0].close.unwrap();
        assert!((100.0..=110.0).contains(&close));
    }

    #[test]
    fn test_weighted_zero_quantity_has_no_close() {
        let resampler = Resampler::new(
            AggregationConfig::new(Frequency::Hour1)
                .with_estimator(EstimatorMode::Weighted(BetaPolicy::default())),
        )
        .unwrap();
        let adverts = vec![sell("a", at(10, 0), 100.0, 0.0), sell("b", at(10, 10), 110.0, 0.0)];
        let buckets = resampler.run(&adverts, at(12, 0));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].close, None);
    }

    #[test]
    fn test_missing_quantity_leaves_volume_undefined() {
        let mut adverts = scenario();
        adverts[1].tradable_quantity = None;
        let buckets = naive(Frequency::Hour1).run(&adverts, at(12, 0));
        assert_eq!(buckets[0].volume, None);
        assert_relative_eq!(buckets[1].volume.unwrap(), 8.0);
        assert_eq!(buckets[0].num_transactions, None);
    }

    #[test]
    fn test_volume_sum_and_transactions() {
        let mut adverts = scenario();
        for a in &mut adverts {
            a.num_transactions = Some(2);
        }
        let resampler =
            Resampler::new(AggregationConfig::new(Frequency::Hour1).with_volume(VolumeAgg::Sum))
                .unwrap();
        let buckets = resampler.run(&adverts, at(12, 0));
        assert_relative_eq!(buckets[0].volume.unwrap(), 8.0);
        assert_eq!(buckets[0].num_transactions, Some(4));
    }

    #[test]
    fn test_duplicate_observations_counted_once() {
        let adverts = vec![sell("a", at(10, 0), 100.0, 1.0), sell("a", at(10, 0), 100.0, 1.0)];
        let buckets = naive(Frequency::Hour1).run(&adverts, at(12, 0));
        assert_eq!(buckets[0].num_ads, 1);
    }

    #[test]
    fn test_markets_and_directions_are_separate() {
        let mut adverts = scenario();
        adverts.push(Advert::new("x", Direction::Buy, "USDT", "BOB", 95.0, at(10, 30)));
        adverts.push(Advert::new("y", Direction::Sell, "BTC", "BOB", 400_000.0, at(10, 30)));

        let buckets = naive(Frequency::Hour1).run(&adverts, at(12, 0));
        assert_eq!(buckets.len(), 4);
        assert_eq!(by_direction(&buckets, &Direction::Buy).len(), 1);

        let buy_only = Resampler::new(
            AggregationConfig::new(Frequency::Hour1).with_directions([Direction::Buy]),
        )
        .unwrap();
        let buckets = buy_only.run(&adverts, at(12, 0));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].volume, None);
    }

    #[test]
    fn test_time_range_is_relative_to_now() {
        let resampler = Resampler::new(
            AggregationConfig::new(Frequency::Hour1).with_time_range(TimeRange::LastDay),
        )
        .unwrap();
        let buckets = resampler.run(&scenario(), at(11, 0) + TimeDelta::days(1));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].interval_start, at(11, 0));
    }

    #[test]
    fn test_outlier_removed_before_bucketing() {
        let mut adverts: Vec<_> = [1.0, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .enumerate()
            .map(|(i, p)| sell(&i.to_string(), at(10, i as u32), *p, 1.0))
            .collect();
        adverts.push(sell("big", at(10, 30), 100.0, 1.0));

        let buckets = naive(Frequency::Hour1).run(&adverts, at(12, 0));
        assert_relative_eq!(buckets[0].high, 5.0);

        let unfiltered = Resampler::new(
            AggregationConfig::new(Frequency::Hour1).with_outlier_filter(false),
        )
        .unwrap();
        assert_relative_eq!(unfiltered.run(&adverts, at(12, 0))[0].high, 100.0);
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let config = AggregationConfig::default()
            .with_estimator(EstimatorMode::Weighted(BetaPolicy::new(-1.0, 1.0, 1.0, 1.0)));
        assert!(Resampler::new(config).is_err());
    }
}
