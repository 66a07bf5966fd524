//! CSV output format.

use cambista_aggregate::Bucket;
use cambista_types::{Advert, Column};
use std::fmt::Display;
use std::io::Write;

use crate::{FormatError, Formatter};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// CSV formatter.
///
/// Missing optional values are written as empty fields.
#[derive(Debug, Clone, Default)]
pub struct CsvFormatter {
    /// Field delimiter (default: comma).
    delimiter: char,
    /// Whether to include header row.
    include_header: bool,
}

impl CsvFormatter {
    /// Creates a new CSV formatter with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }

    /// Sets the field delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether to include a header row.
    #[must_use]
    pub const fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Creates a tab-separated values (TSV) formatter.
    #[must_use]
    pub const fn tsv() -> Self {
        Self {
            delimiter: '\t',
            include_header: true,
        }
    }

    fn write_row<W: Write>(&self, writer: &mut W, fields: &[String]) -> Result<(), FormatError> {
        let line = fields
            .iter()
            .map(|f| self.escape(f))
            .collect::<Vec<_>>()
            .join(&self.delimiter.to_string());
        writeln!(writer, "{line}")?;
        Ok(())
    }

    fn escape(&self, field: &str) -> String {
        if field.contains(self.delimiter) || field.contains(['"', '\n', '\r']) {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}

fn opt<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Renders one advert field as text.
fn advert_field(advert: &Advert, column: Column) -> String {
    match column {
        Column::Id => advert.id.clone(),
        Column::Classify => opt(advert.classify.as_deref()),
        Column::Direction => advert.direction.to_string(),
        Column::Asset => advert.asset.clone(),
        Column::FiatUnit => advert.fiat_unit.clone(),
        Column::FiatSymbol => opt(advert.fiat_symbol.as_deref()),
        Column::Price => advert.price.to_string(),
        Column::SurplusAmount => opt(advert.surplus_amount),
        Column::TradableQuantity => opt(advert.tradable_quantity),
        Column::MinSingleTransAmount => opt(advert.min_single_trans_amount),
        Column::MaxSingleTransAmount => opt(advert.max_single_trans_amount),
        Column::DynamicMaxSingleTransAmount => opt(advert.dynamic_max_single_trans_amount),
        Column::MinSingleTransQuantity => opt(advert.min_single_trans_quantity),
        Column::MaxSingleTransQuantity => opt(advert.max_single_trans_quantity),
        Column::DynamicMaxSingleTransQuantity => opt(advert.dynamic_max_single_trans_quantity),
        Column::PayTimeLimit => opt(advert.pay_time_limit),
        Column::KycRequired => opt(advert.kyc_required),
        Column::IsTradable => opt(advert.is_tradable),
        Column::IsSafePayment => opt(advert.is_safe_payment),
        Column::AssetScale => opt(advert.asset_scale),
        Column::FiatScale => opt(advert.fiat_scale),
        Column::PriceScale => opt(advert.price_scale),
        Column::Timestamp => advert.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        Column::Source => opt(advert.source.as_deref()),
        Column::NumTransactions => opt(advert.num_transactions),
    }
}

impl Formatter for CsvFormatter {
    fn write_adverts<W: Write + Send>(
        &self,
        adverts: &[Advert],
        mut writer: W,
    ) -> Result<(), FormatError> {
        if self.include_header {
            let header: Vec<String> = Column::ALL
                .iter()
                .map(|c| c.storage_name().to_string())
                .collect();
            self.write_row(&mut writer, &header)?;
        }

        for advert in adverts {
            let fields: Vec<String> = Column::ALL
                .iter()
                .map(|c| advert_field(advert, *c))
                .collect();
            self.write_row(&mut writer, &fields)?;
        }

        Ok(())
    }

    fn write_buckets<W: Write + Send>(
        &self,
        buckets: &[Bucket],
        mut writer: W,
    ) -> Result<(), FormatError> {
        let d = self.delimiter;

        if self.include_header {
            writeln!(
                writer,
                "interval_start{d}frequency{d}asset{d}fiat_unit{d}direction{d}open{d}high{d}low{d}close{d}volume{d}num_ads{d}num_transactions"
            )?;
        }

        for bucket in buckets {
            let fields = vec![
                bucket.interval_start.format(TIMESTAMP_FORMAT).to_string(),
                bucket.frequency.label(),
                bucket.asset.clone(),
                bucket.fiat_unit.clone(),
                bucket.direction.to_string(),
                bucket.open.to_string(),
                bucket.high.to_string(),
                bucket.low.to_string(),
                opt(bucket.close),
                opt(bucket.volume),
                bucket.num_ads.to_string(),
                opt(bucket.num_transactions),
            ];
            self.write_row(&mut writer, &fields)?;
        }

        Ok(())
    }

    fn extension(&self) -> &str {
        "csv"
    }
}
