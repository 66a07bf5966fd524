//! Optional metrics and the input columns they depend on.

use cambista_types::{Column, ColumnSet};
use serde::{Deserialize, Serialize};

/// A bucket metric that is only computed when its inputs are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Aggregated tradable quantity.
    Volume,
    /// Beta-weighted representative close.
    WeightedClose,
    /// Summed upstream transaction count.
    Transactions,
}

impl Metric {
    /// All optional metrics.
    pub const ALL: [Self; 3] = [Self::Volume, Self::WeightedClose, Self::Transactions];

    /// Returns the column-style name of the metric.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::WeightedClose => "weighted_close",
            Self::Transactions => "num_transactions",
        }
    }

    /// Columns that must be present for this metric to be computed.
    #[must_use]
    pub const fn requires(&self) -> &'static [Column] {
        match self {
            Self::Volume | Self::WeightedClose => &[Column::TradableQuantity],
            Self::Transactions => &[Column::NumTransactions],
        }
    }

    /// Returns true if every required column is in `columns`.
    #[must_use]
    pub fn is_available(&self, columns: &ColumnSet) -> bool {
        columns.contains_all(self.requires())
    }

    /// Returns the metrics computable from `columns`.
    #[must_use]
    pub fn available(columns: &ColumnSet) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|m| m.is_available(columns))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_metrics() {
        let mut columns: ColumnSet = Column::REQUIRED.iter().copied().collect();
        assert!(Metric::available(&columns).is_empty());

        columns.insert(Column::TradableQuantity);
        assert_eq!(
            Metric::available(&columns),
            vec![Metric::Volume, Metric::WeightedClose]
        );

        columns.insert(Column::NumTransactions);
        assert_eq!(Metric::available(&columns).len(), 3);
    }
}
