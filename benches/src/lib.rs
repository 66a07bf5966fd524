//! Benchmark fixtures for cambista.

use cambista_types::{Advert, Direction};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

/// Shape of a synthetic advert set.
#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    /// Number of adverts.
    pub adverts: usize,
    /// Seconds between consecutive snapshot timestamps.
    pub spacing_secs: i64,
    /// Adverts sharing one snapshot timestamp.
    pub per_snapshot: usize,
}

impl Fixture {
    /// Creates a fixture with 30-minute snapshots of 40 adverts each.
    #[must_use]
    pub const fn new(adverts: usize) -> Self {
        Self {
            adverts,
            spacing_secs: 1800,
            per_snapshot: 40,
        }
    }

    /// Builds the adverts, alternating SELL and BUY, with deterministic
    /// prices around 9.9 and a handful of outliers.
    #[must_use]
    pub fn build(&self) -> Vec<Advert> {
        let start = epoch();
        let per_snapshot = self.per_snapshot.max(1);
        (0..self.adverts)
            .map(|i| {
                let snapshot = (i / per_snapshot) as i64;
                let ts = start + TimeDelta::seconds(snapshot * self.spacing_secs);
                let direction = if i % 2 == 0 {
                    Direction::Sell
                } else {
                    Direction::Buy
                };
                let jitter = ((i * 7919) % 200) as f64 / 1000.0;
                let price = if i % 97 == 0 { 14.0 } else { 9.8 + jitter };
                let quantity = 10.0 + ((i * 31) % 500) as f64;
                Advert::new(i.to_string(), direction, "USDT", "BOB", price, ts)
                    .with_quantity(quantity)
            })
            .collect()
    }
}

/// First snapshot time of every fixture.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_is_deterministic() {
        let a = Fixture::new(500).build();
        let b = Fixture::new(500).build();
        assert_eq!(a, b);
        assert_eq!(a.len(), 500);
        assert_eq!(a[40].timestamp, epoch() + TimeDelta::seconds(1800));
    }
}
