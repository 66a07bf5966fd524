//! Apache Parquet output format and reader.

use arrow::array::{
    Array, ArrayRef, ArrowPrimitiveType, AsArray, BooleanArray, Float64Array, Int32Array,
    Int64Array, StringArray, TimestampMicrosecondArray, UInt32Array, UInt64Array,
};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Field, Float64Type, Int32Type, Int64Type, Schema, SchemaRef, TimeUnit,
    TimestampMicrosecondType, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use cambista_aggregate::Bucket;
use cambista_types::{Advert, Column, Direction, Frequency};
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::ChunkReader;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use crate::{FormatError, Formatter};

fn parquet_err(e: impl std::fmt::Display) -> FormatError {
    FormatError::Parquet(e.to_string())
}

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

/// Storage type of an advert column.
fn column_type(column: Column) -> DataType {
    match column {
        Column::Id
        | Column::Classify
        | Column::Direction
        | Column::Asset
        | Column::FiatUnit
        | Column::FiatSymbol
        | Column::Source => DataType::Utf8,
        Column::Price
        | Column::SurplusAmount
        | Column::TradableQuantity
        | Column::MinSingleTransAmount
        | Column::MaxSingleTransAmount
        | Column::DynamicMaxSingleTransAmount
        | Column::MinSingleTransQuantity
        | Column::MaxSingleTransQuantity
        | Column::DynamicMaxSingleTransQuantity => DataType::Float64,
        Column::PayTimeLimit => DataType::Int64,
        Column::KycRequired | Column::IsTradable | Column::IsSafePayment => DataType::Boolean,
        Column::AssetScale | Column::FiatScale | Column::PriceScale => DataType::Int32,
        Column::Timestamp => timestamp_type(),
        Column::NumTransactions => DataType::UInt64,
    }
}

const BUCKET_COLUMNS: [(&str, bool); 12] = [
    ("interval_start", true),
    ("frequency", true),
    ("asset", true),
    ("fiat_unit", true),
    ("direction", true),
    ("open", true),
    ("high", true),
    ("low", true),
    ("close", false),
    ("volume", false),
    ("num_ads", true),
    ("num_transactions", false),
];

fn bucket_type(name: &str) -> DataType {
    match name {
        "interval_start" => timestamp_type(),
        "frequency" | "asset" | "fiat_unit" | "direction" => DataType::Utf8,
        "num_ads" => DataType::UInt32,
        "num_transactions" => DataType::UInt64,
        _ => DataType::Float64,
    }
}

/// Parquet formatter.
#[derive(Debug, Clone)]
pub struct ParquetFormatter {
    /// Row group size (number of rows per group).
    row_group_size: usize,
    /// Compression codec.
    compression: Compression,
}

impl Default for ParquetFormatter {
    fn default() -> Self {
        Self {
            row_group_size: 100_000,
            compression: Compression::SNAPPY,
        }
    }
}

impl ParquetFormatter {
    /// Creates a new Parquet formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the row group size.
    #[must_use]
    pub const fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Sets the compression codec.
    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Creates the Arrow schema for advertisement records.
    ///
    /// Optional columns are nullable.
    #[must_use]
    pub fn advert_schema() -> Schema {
        Schema::new(
            Column::ALL
                .iter()
                .map(|c| Field::new(c.storage_name(), column_type(*c), !c.is_required()))
                .collect::<Vec<_>>(),
        )
    }

    /// Creates the Arrow schema for buckets.
    #[must_use]
    pub fn bucket_schema() -> Schema {
        Schema::new(
            BUCKET_COLUMNS
                .iter()
                .map(|(name, required)| Field::new(*name, bucket_type(name), !required))
                .collect::<Vec<_>>(),
        )
    }

    /// Converts adverts to an Arrow RecordBatch.
    fn adverts_to_batch(schema: SchemaRef, adverts: &[Advert]) -> Result<RecordBatch, FormatError> {
        let columns = Column::ALL
            .iter()
            .map(|c| advert_array(adverts, *c))
            .collect();
        RecordBatch::try_new(schema, columns).map_err(parquet_err)
    }

    /// Converts buckets to an Arrow RecordBatch.
    fn buckets_to_batch(schema: SchemaRef, buckets: &[Bucket]) -> Result<RecordBatch, FormatError> {
        let starts: Vec<_> = buckets
            .iter()
            .map(|b| b.interval_start.timestamp_micros())
            .collect();
        let text = |f: fn(&Bucket) -> String| -> ArrayRef {
            Arc::new(StringArray::from(buckets.iter().map(f).collect::<Vec<_>>()))
        };
        let float = |f: fn(&Bucket) -> Option<f64>| -> ArrayRef {
            Arc::new(Float64Array::from(buckets.iter().map(f).collect::<Vec<_>>()))
        };

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampMicrosecondArray::from(starts).with_timezone("UTC")),
                text(|b| b.frequency.label()),
                text(|b| b.asset.clone()),
                text(|b| b.fiat_unit.clone()),
                text(|b| b.direction.to_string()),
                float(|b| Some(b.open)),
                float(|b| Some(b.high)),
                float(|b| Some(b.low)),
                float(|b| b.close),
                float(|b| b.volume),
                Arc::new(UInt32Array::from(
                    buckets.iter().map(|b| b.num_ads).collect::<Vec<_>>(),
                )),
                Arc::new(UInt64Array::from(
                    buckets.iter().map(|b| b.num_transactions).collect::<Vec<_>>(),
                )),
            ],
        )
        .map_err(parquet_err)
    }

    fn write_batches<T, W: Write + Send>(
        &self,
        items: &[T],
        schema: Schema,
        to_batch: fn(SchemaRef, &[T]) -> Result<RecordBatch, FormatError>,
        writer: W,
    ) -> Result<(), FormatError> {
        let schema = Arc::new(schema);
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut arrow_writer =
            ArrowWriter::try_new(writer, Arc::clone(&schema), Some(props)).map_err(parquet_err)?;

        for chunk in items.chunks(self.row_group_size.max(1)) {
            let batch = to_batch(Arc::clone(&schema), chunk)?;
            arrow_writer.write(&batch).map_err(parquet_err)?;
        }

        arrow_writer.close().map_err(parquet_err)?;
        Ok(())
    }
}

/// Builds the Arrow column for one advert field.
fn advert_array(adverts: &[Advert], column: Column) -> ArrayRef {
    let text = |f: &dyn Fn(&Advert) -> Option<String>| -> ArrayRef {
        Arc::new(StringArray::from(adverts.iter().map(f).collect::<Vec<_>>()))
    };
    let float = |f: &dyn Fn(&Advert) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(adverts.iter().map(f).collect::<Vec<_>>()))
    };
    let flag = |f: &dyn Fn(&Advert) -> Option<bool>| -> ArrayRef {
        Arc::new(BooleanArray::from(adverts.iter().map(f).collect::<Vec<_>>()))
    };
    let scale = |f: &dyn Fn(&Advert) -> Option<i32>| -> ArrayRef {
        Arc::new(Int32Array::from(adverts.iter().map(f).collect::<Vec<_>>()))
    };

    match column {
        Column::Id => text(&|a| Some(a.id.clone())),
        Column::Classify => text(&|a| a.classify.clone()),
        Column::Direction => text(&|a| Some(a.direction.to_string())),
        Column::Asset => text(&|a| Some(a.asset.clone())),
        Column::FiatUnit => text(&|a| Some(a.fiat_unit.clone())),
        Column::FiatSymbol => text(&|a| a.fiat_symbol.clone()),
        Column::Source => text(&|a| a.source.clone()),
        Column::Price => float(&|a| Some(a.price)),
        Column::SurplusAmount => float(&|a| a.surplus_amount),
        Column::TradableQuantity => float(&|a| a.tradable_quantity),
        Column::MinSingleTransAmount => float(&|a| a.min_single_trans_amount),
        Column::MaxSingleTransAmount => float(&|a| a.max_single_trans_amount),
        Column::DynamicMaxSingleTransAmount => float(&|a| a.dynamic_max_single_trans_amount),
        Column::MinSingleTransQuantity => float(&|a| a.min_single_trans_quantity),
        Column::MaxSingleTransQuantity => float(&|a| a.max_single_trans_quantity),
        Column::DynamicMaxSingleTransQuantity => {
            float(&|a| a.dynamic_max_single_trans_quantity)
        }
        Column::PayTimeLimit => Arc::new(Int64Array::from(
            adverts.iter().map(|a| a.pay_time_limit).collect::<Vec<_>>(),
        )),
        Column::KycRequired => flag(&|a| a.kyc_required),
        Column::IsTradable => flag(&|a| a.is_tradable),
        Column::IsSafePayment => flag(&|a| a.is_safe_payment),
        Column::AssetScale => scale(&|a| a.asset_scale),
        Column::FiatScale => scale(&|a| a.fiat_scale),
        Column::PriceScale => scale(&|a| a.price_scale),
        Column::Timestamp => Arc::new(
            TimestampMicrosecondArray::from(
                adverts
                    .iter()
                    .map(|a| a.timestamp.timestamp_micros())
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        ),
        Column::NumTransactions => Arc::new(UInt64Array::from(
            adverts.iter().map(|a| a.num_transactions).collect::<Vec<_>>(),
        )),
    }
}

impl Formatter for ParquetFormatter {
    fn write_adverts<W: Write + Send>(
        &self,
        adverts: &[Advert],
        writer: W,
    ) -> Result<(), FormatError> {
        self.write_batches(adverts, Self::advert_schema(), Self::adverts_to_batch, writer)
    }

    fn write_buckets<W: Write + Send>(
        &self,
        buckets: &[Bucket],
        writer: W,
    ) -> Result<(), FormatError> {
        self.write_batches(buckets, Self::bucket_schema(), Self::buckets_to_batch, writer)
    }

    fn extension(&self) -> &str {
        "parquet"
    }
}

/// Columns of one record batch, cast to their expected types.
///
/// Columns absent from the file are simply missing from the map.
struct Frame {
    arrays: HashMap<&'static str, ArrayRef>,
    offset: usize,
}

impl Frame {
    fn load(
        batch: &RecordBatch,
        columns: impl IntoIterator<Item = (&'static str, DataType, bool)>,
        offset: usize,
    ) -> Result<Self, FormatError> {
        let mut arrays = HashMap::new();
        for (name, data_type, required) in columns {
            match batch.column_by_name(name) {
                Some(array) => {
                    let array = cast(array, &data_type).map_err(|e| FormatError::InvalidValue {
                        column: name,
                        message: e.to_string(),
                    })?;
                    arrays.insert(name, array);
                }
                None if required => return Err(FormatError::MissingColumn(name)),
                None => {}
            }
        }
        Ok(Self { arrays, offset })
    }

    fn primitive<T: ArrowPrimitiveType>(&self, name: &str, row: usize) -> Option<T::Native> {
        let array = self.arrays.get(name)?.as_primitive_opt::<T>()?;
        array.is_valid(row).then(|| array.value(row))
    }

    fn float(&self, name: &str, row: usize) -> Option<f64> {
        self.primitive::<Float64Type>(name, row)
    }

    fn text(&self, name: &str, row: usize) -> Option<String> {
        let array = self.arrays.get(name)?.as_string_opt::<i32>()?;
        array.is_valid(row).then(|| array.value(row).to_string())
    }

    fn flag(&self, name: &str, row: usize) -> Option<bool> {
        let array = self.arrays.get(name)?.as_boolean_opt()?;
        array.is_valid(row).then(|| array.value(row))
    }

    fn timestamp(&self, name: &str, row: usize) -> Option<DateTime<Utc>> {
        self.primitive::<TimestampMicrosecondType>(name, row)
            .and_then(DateTime::from_timestamp_micros)
    }

    fn require<T>(&self, value: Option<T>, column: &'static str, row: usize) -> Result<T, FormatError> {
        value.ok_or(FormatError::NullValue {
            column,
            row: self.offset + row,
        })
    }
}

/// Reads Parquet files written by [`ParquetFormatter`], tolerating schema
/// drift: optional columns missing from a file read as `None`.
#[derive(Debug, Clone)]
pub struct ParquetReader {
    batch_size: usize,
}

impl Default for ParquetReader {
    fn default() -> Self {
        Self { batch_size: 8192 }
    }
}

impl ParquetReader {
    /// Creates a reader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of rows decoded per batch.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn batches<R: ChunkReader + 'static>(
        &self,
        reader: R,
    ) -> Result<impl Iterator<Item = Result<RecordBatch, FormatError>>, FormatError> {
        let reader = ParquetRecordBatchReaderBuilder::try_new(reader)
            .map_err(parquet_err)?
            .with_batch_size(self.batch_size.max(1))
            .build()
            .map_err(parquet_err)?;
        Ok(reader.map(|batch| batch.map_err(parquet_err)))
    }

    /// Reads advertisement records.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not valid Parquet, a required column
    /// is missing, or a required value is null.
    pub fn read_adverts<R: ChunkReader + 'static>(&self, reader: R) -> Result<Vec<Advert>, FormatError> {
        let mut adverts = Vec::new();
        for batch in self.batches(reader)? {
            let batch = batch?;
            let frame = Frame::load(
                &batch,
                Column::ALL
                    .iter()
                    .map(|c| (c.storage_name(), column_type(*c), c.is_required())),
                adverts.len(),
            )?;
            for row in 0..batch.num_rows() {
                adverts.push(decode_advert(&frame, row)?);
            }
        }
        Ok(adverts)
    }

    /// Reads advertisement records from an in-memory file.
    ///
    /// # Errors
    ///
    /// See [`ParquetReader::read_adverts`].
    pub fn read_adverts_from_bytes(&self, data: impl Into<Bytes>) -> Result<Vec<Advert>, FormatError> {
        self.read_adverts(data.into())
    }

    /// Reads buckets.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not valid Parquet, a required column
    /// is missing, or a stored frequency cannot be parsed.
    pub fn read_buckets<R: ChunkReader + 'static>(&self, reader: R) -> Result<Vec<Bucket>, FormatError> {
        let mut buckets = Vec::new();
        for batch in self.batches(reader)? {
            let batch = batch?;
            let frame = Frame::load(
                &batch,
                BUCKET_COLUMNS
                    .iter()
                    .map(|(name, required)| (*name, bucket_type(name), *required)),
                buckets.len(),
            )?;
            for row in 0..batch.num_rows() {
                buckets.push(decode_bucket(&frame, row)?);
            }
        }
        Ok(buckets)
    }

    /// Reads buckets from an in-memory file.
    ///
    /// # Errors
    ///
    /// See [`ParquetReader::read_buckets`].
    pub fn read_buckets_from_bytes(&self, data: impl Into<Bytes>) -> Result<Vec<Bucket>, FormatError> {
        self.read_buckets(data.into())
    }
}

fn decode_advert(frame: &Frame, row: usize) -> Result<Advert, FormatError> {
    let name = |c: Column| c.storage_name();
    let required_text = |c: Column| frame.require(frame.text(name(c), row), name(c), row);
    let text = |c: Column| frame.text(name(c), row);
    let float = |c: Column| frame.float(name(c), row);
    let flag = |c: Column| frame.flag(name(c), row);
    let scale = |c: Column| frame.primitive::<Int32Type>(name(c), row);

    let mut advert = Advert::new(
        required_text(Column::Id)?,
        Direction::from(required_text(Column::Direction)?.as_str()),
        required_text(Column::Asset)?,
        required_text(Column::FiatUnit)?,
        frame.require(float(Column::Price), name(Column::Price), row)?,
        frame.require(
            frame.timestamp(name(Column::Timestamp), row),
            name(Column::Timestamp),
            row,
        )?,
    );
    advert.classify = text(Column::Classify);
    advert.fiat_symbol = text(Column::FiatSymbol);
    advert.source = text(Column::Source);
    advert.surplus_amount = float(Column::SurplusAmount);
    advert.tradable_quantity = float(Column::TradableQuantity);
    advert.min_single_trans_amount = float(Column::MinSingleTransAmount);
    advert.max_single_trans_amount = float(Column::MaxSingleTransAmount);
    advert.dynamic_max_single_trans_amount = float(Column::DynamicMaxSingleTransAmount);
    advert.min_single_trans_quantity = float(Column::MinSingleTransQuantity);
    advert.max_single_trans_quantity = float(Column::MaxSingleTransQuantity);
    advert.dynamic_max_single_trans_quantity = float(Column::DynamicMaxSingleTransQuantity);
    advert.pay_time_limit = frame.primitive::<Int64Type>(name(Column::PayTimeLimit), row);
    advert.kyc_required = flag(Column::KycRequired);
    advert.is_tradable = flag(Column::IsTradable);
    advert.is_safe_payment = flag(Column::IsSafePayment);
    advert.asset_scale = scale(Column::AssetScale);
    advert.fiat_scale = scale(Column::FiatScale);
    advert.price_scale = scale(Column::PriceScale);
    advert.num_transactions = frame.primitive::<UInt64Type>(name(Column::NumTransactions), row);
    Ok(advert)
}

fn decode_bucket(frame: &Frame, row: usize) -> Result<Bucket, FormatError> {
    let text = |name: &'static str| frame.require(frame.text(name, row), name, row);
    let float = |name: &'static str| frame.require(frame.float(name, row), name, row);

    let label = text("frequency")?;
    let frequency: Frequency = label.parse().map_err(|_| FormatError::InvalidValue {
        column: "frequency",
        message: format!("unknown frequency {label:?}"),
    })?;

    Ok(Bucket {
        interval_start: frame.require(frame.timestamp("interval_start", row), "interval_start", row)?,
        frequency,
        asset: text("asset")?,
        fiat_unit: text("fiat_unit")?,
        direction: Direction::from(text("direction")?.as_str()),
        open: float("open")?,
        high: float("high")?,
        low: float("low")?,
        close: frame.float("close", row),
        volume: frame.float("volume", row),
        num_ads: frame.require(frame.primitive::<UInt32Type>("num_ads", row), "num_ads", row)?,
        num_transactions: frame.primitive::<UInt64Type>("num_transactions", row),
    })
}
