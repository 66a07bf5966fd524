//! Advertisement records and their canonical column set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{Direction, MarketKey};

/// A canonical column of the advertisement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Advertisement identifier.
    Id,
    /// Advertisement classification (e.g. "mass", "profession").
    Classify,
    /// Trade direction.
    Direction,
    /// Traded asset symbol.
    Asset,
    /// Settlement currency code.
    FiatUnit,
    /// Settlement currency symbol.
    FiatSymbol,
    /// Price of one asset unit in fiat.
    Price,
    /// Remaining fiat amount.
    SurplusAmount,
    /// Asset quantity available at this price.
    TradableQuantity,
    /// Minimum fiat amount per trade.
    MinSingleTransAmount,
    /// Maximum fiat amount per trade.
    MaxSingleTransAmount,
    /// Dynamic maximum fiat amount per trade.
    DynamicMaxSingleTransAmount,
    /// Minimum asset quantity per trade.
    MinSingleTransQuantity,
    /// Maximum asset quantity per trade.
    MaxSingleTransQuantity,
    /// Dynamic maximum asset quantity per trade.
    DynamicMaxSingleTransQuantity,
    /// Payment time limit.
    PayTimeLimit,
    /// Whether additional KYC is required from the taker.
    KycRequired,
    /// Whether the advertisement is tradable.
    IsTradable,
    /// Whether the payment method is flagged as safe.
    IsSafePayment,
    /// Asset decimal places.
    AssetScale,
    /// Fiat decimal places.
    FiatScale,
    /// Price decimal places.
    PriceScale,
    /// Snapshot time.
    Timestamp,
    /// Provenance tag.
    Source,
    /// Upstream transaction count.
    NumTransactions,
}

impl Column {
    /// Every canonical column, in storage order.
    pub const ALL: [Self; 25] = [
        Self::Id,
        Self::Classify,
        Self::Direction,
        Self::Asset,
        Self::FiatUnit,
        Self::FiatSymbol,
        Self::Price,
        Self::SurplusAmount,
        Self::TradableQuantity,
        Self::MinSingleTransAmount,
        Self::MaxSingleTransAmount,
        Self::DynamicMaxSingleTransAmount,
        Self::MinSingleTransQuantity,
        Self::MaxSingleTransQuantity,
        Self::DynamicMaxSingleTransQuantity,
        Self::PayTimeLimit,
        Self::KycRequired,
        Self::IsTradable,
        Self::IsSafePayment,
        Self::AssetScale,
        Self::FiatScale,
        Self::PriceScale,
        Self::Timestamp,
        Self::Source,
        Self::NumTransactions,
    ];

    /// Columns every advertisement must carry.
    pub const REQUIRED: [Self; 6] = [
        Self::Id,
        Self::Direction,
        Self::Asset,
        Self::FiatUnit,
        Self::Price,
        Self::Timestamp,
    ];

    /// Returns the upstream name after key canonicalisation
    /// (lower case, no separators).
    #[must_use]
    pub const fn upstream_name(&self) -> &'static str {
        match self {
            Self::Id => "advno",
            Self::Classify => "classify",
            Self::Direction => "tradetype",
            Self::Asset => "asset",
            Self::FiatUnit => "fiatunit",
            Self::FiatSymbol => "fiatsymbol",
            Self::Price => "price",
            Self::SurplusAmount => "surplusamount",
            Self::TradableQuantity => "tradablequantity",
            Self::MinSingleTransAmount => "minsingletransamount",
            Self::MaxSingleTransAmount => "maxsingletransamount",
            Self::DynamicMaxSingleTransAmount => "dynamicmaxsingletransamount",
            Self::MinSingleTransQuantity => "minsingletransquantity",
            Self::MaxSingleTransQuantity => "maxsingletransquantity",
            Self::DynamicMaxSingleTransQuantity => "dynamicmaxsingletransquantity",
            Self::PayTimeLimit => "paytimelimit",
            Self::KycRequired => "takeradditionalkycrequired",
            Self::IsTradable => "istradable",
            Self::IsSafePayment => "issafepayment",
            Self::AssetScale => "assetscale",
            Self::FiatScale => "fiatscale",
            Self::PriceScale => "pricescale",
            Self::Timestamp => "timestamp",
            Self::Source => "source",
            Self::NumTransactions => "numtransactions",
        }
    }

    /// Returns the column name used in stored files.
    #[must_use]
    pub const fn storage_name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Classify => "classify",
            Self::Direction => "direction",
            Self::Asset => "asset",
            Self::FiatUnit => "fiat_unit",
            Self::FiatSymbol => "fiat_symbol",
            Self::Price => "price",
            Self::SurplusAmount => "surplus_amount",
            Self::TradableQuantity => "tradable_quantity",
            Self::MinSingleTransAmount => "min_single_trans_amount",
            Self::MaxSingleTransAmount => "max_single_trans_amount",
            Self::DynamicMaxSingleTransAmount => "dynamic_max_single_trans_amount",
            Self::MinSingleTransQuantity => "min_single_trans_quantity",
            Self::MaxSingleTransQuantity => "max_single_trans_quantity",
            Self::DynamicMaxSingleTransQuantity => "dynamic_max_single_trans_quantity",
            Self::PayTimeLimit => "pay_time_limit",
            Self::KycRequired => "kyc_required",
            Self::IsTradable => "is_tradable",
            Self::IsSafePayment => "is_safe_payment",
            Self::AssetScale => "asset_scale",
            Self::FiatScale => "fiat_scale",
            Self::PriceScale => "price_scale",
            Self::Timestamp => "timestamp",
            Self::Source => "source",
            Self::NumTransactions => "num_transactions",
        }
    }

    /// Looks up a column by its canonical upstream name.
    #[must_use]
    pub fn from_upstream(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.upstream_name() == name)
    }

    /// Returns true if every advertisement must carry this column.
    #[must_use]
    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_name())
    }
}

/// The set of columns a dataset actually carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet(BTreeSet<Column>);

impl ColumnSet {
    /// Creates an empty column set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds a column.
    pub fn insert(&mut self, column: Column) {
        self.0.insert(column);
    }

    /// Returns true if the column is present.
    #[must_use]
    pub fn contains(&self, column: Column) -> bool {
        self.0.contains(&column)
    }

    /// Returns true if every listed column is present.
    #[must_use]
    pub fn contains_all(&self, columns: &[Column]) -> bool {
        columns.iter().all(|c| self.0.contains(c))
    }

    /// Iterates over the present columns in storage order.
    pub fn iter(&self) -> impl Iterator<Item = Column> + '_ {
        self.0.iter().copied()
    }

    /// Returns the number of present columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no column is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Computes the columns present on every advert of a slice.
    #[must_use]
    pub fn of(adverts: &[Advert]) -> Self {
        Column::ALL
            .into_iter()
            .filter(|c| adverts.iter().all(|a| a.has(*c)))
            .collect()
    }
}

impl FromIterator<Column> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = Column>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One advertisement snapshot as collected from the marketplace.
///
/// Records are immutable once collected; `id` is not unique across fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advert {
    /// Opaque advertisement identifier.
    pub id: String,
    /// Sell or buy side.
    pub direction: Direction,
    /// Traded asset symbol (e.g. "USDT").
    pub asset: String,
    /// Settlement currency code (e.g. "BOB").
    pub fiat_unit: String,
    /// Price of one asset unit in fiat.
    pub price: f64,
    /// Snapshot time, second resolution.
    pub timestamp: DateTime<Utc>,
    /// Settlement currency symbol.
    #[serde(default)]
    pub fiat_symbol: Option<String>,
    /// Advertisement classification.
    #[serde(default)]
    pub classify: Option<String>,
    /// Asset quantity available at this price.
    #[serde(default)]
    pub tradable_quantity: Option<f64>,
    /// Remaining fiat amount.
    #[serde(default)]
    pub surplus_amount: Option<f64>,
    /// Minimum fiat amount per trade.
    #[serde(default)]
    pub min_single_trans_amount: Option<f64>,
    /// Maximum fiat amount per trade.
    #[serde(default)]
    pub max_single_trans_amount: Option<f64>,
    /// Dynamic maximum fiat amount per trade.
    #[serde(default)]
    pub dynamic_max_single_trans_amount: Option<f64>,
    /// Minimum asset quantity per trade.
    #[serde(default)]
    pub min_single_trans_quantity: Option<f64>,
    /// Maximum asset quantity per trade.
    #[serde(default)]
    pub max_single_trans_quantity: Option<f64>,
    /// Dynamic maximum asset quantity per trade.
    #[serde(default)]
    pub dynamic_max_single_trans_quantity: Option<f64>,
    /// Payment time limit as reported upstream.
    #[serde(default)]
    pub pay_time_limit: Option<i64>,
    /// Whether additional KYC is required from the taker.
    #[serde(default)]
    pub kyc_required: Option<bool>,
    /// Whether the advertisement is tradable.
    #[serde(default)]
    pub is_tradable: Option<bool>,
    /// Whether the payment method is flagged as safe.
    #[serde(default)]
    pub is_safe_payment: Option<bool>,
    /// Asset decimal places.
    #[serde(default)]
    pub asset_scale: Option<i32>,
    /// Fiat decimal places.
    #[serde(default)]
    pub fiat_scale: Option<i32>,
    /// Price decimal places.
    #[serde(default)]
    pub price_scale: Option<i32>,
    /// Provenance tag.
    #[serde(default)]
    pub source: Option<String>,
    /// Upstream transaction count, when the source reports one.
    #[serde(default)]
    pub num_transactions: Option<u64>,
}

impl Advert {
    /// Creates an advert with only the required fields set.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        direction: Direction,
        asset: impl Into<String>,
        fiat_unit: impl Into<String>,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            direction,
            asset: asset.into(),
            fiat_unit: fiat_unit.into(),
            price,
            timestamp,
            fiat_symbol: None,
            classify: None,
            tradable_quantity: None,
            surplus_amount: None,
            min_single_trans_amount: None,
            max_single_trans_amount: None,
            dynamic_max_single_trans_amount: None,
            min_single_trans_quantity: None,
            max_single_trans_quantity: None,
            dynamic_max_single_trans_quantity: None,
            pay_time_limit: None,
            kyc_required: None,
            is_tradable: None,
            is_safe_payment: None,
            asset_scale: None,
            fiat_scale: None,
            price_scale: None,
            source: None,
            num_transactions: None,
        }
    }

    /// Sets the tradable quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: f64) -> Self {
        self.tradable_quantity = Some(quantity);
        self
    }

    /// Sets the provenance tag.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the grouping key of this advert.
    #[must_use]
    pub fn market(&self) -> MarketKey {
        MarketKey::new(&self.asset, &self.fiat_unit, self.direction.clone())
    }

    /// Returns true if the advert carries a value for the column.
    #[must_use]
    pub const fn has(&self, column: Column) -> bool {
        match column {
            Column::Id
            | Column::Direction
            | Column::Asset
            | Column::FiatUnit
            | Column::Price
            | Column::Timestamp => true,
            Column::Classify => self.classify.is_some(),
            Column::FiatSymbol => self.fiat_symbol.is_some(),
            Column::SurplusAmount => self.surplus_amount.is_some(),
            Column::TradableQuantity => self.tradable_quantity.is_some(),
            Column::MinSingleTransAmount => self.min_single_trans_amount.is_some(),
            Column::MaxSingleTransAmount => self.max_single_trans_amount.is_some(),
            Column::DynamicMaxSingleTransAmount => self.dynamic_max_single_trans_amount.is_some(),
            Column::MinSingleTransQuantity => self.min_single_trans_quantity.is_some(),
            Column::MaxSingleTransQuantity => self.max_single_trans_quantity.is_some(),
            Column::DynamicMaxSingleTransQuantity => {
                self.dynamic_max_single_trans_quantity.is_some()
            }
            Column::PayTimeLimit => self.pay_time_limit.is_some(),
            Column::KycRequired => self.kyc_required.is_some(),
            Column::IsTradable => self.is_tradable.is_some(),
            Column::IsSafePayment => self.is_safe_payment.is_some(),
            Column::AssetScale => self.asset_scale.is_some(),
            Column::FiatScale => self.fiat_scale.is_some(),
            Column::PriceScale => self.price_scale.is_some(),
            Column::Source => self.source.is_some(),
            Column::NumTransactions => self.num_transactions.is_some(),
        }
    }
}
