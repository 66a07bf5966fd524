//! Mapping of heterogeneous flat records onto the canonical advert schema.

use std::collections::HashMap;

use cambista_types::{Advert, Column, ColumnSet, Direction};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::RawRecord;

/// Epoch values at or above this are milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Prefixes removed before canonicalising a key.
const PREFIXES: [&str; 2] = ["adv.", "advertiser."];

/// Adverts recovered from one batch of raw records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    /// Records that carried every required field.
    pub adverts: Vec<Advert>,
    /// Columns present in every advert of the batch.
    pub columns: ColumnSet,
    /// Records dropped for missing or unparseable required fields.
    pub dropped: usize,
}

/// Canonicalises a source key: strips a known prefix, lower-cases, drops `_`.
#[must_use]
pub fn canonical_key(key: &str) -> String {
    let stripped = PREFIXES
        .iter()
        .find_map(|p| key.strip_prefix(p))
        .unwrap_or(key);
    stripped.to_lowercase().replace('_', "")
}

/// Normalizes a batch, dropping records that miss a required field.
#[must_use]
pub fn normalize(records: &[RawRecord]) -> NormalizedBatch {
    let mut adverts = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records {
        match normalize_record(record) {
            Some(advert) => adverts.push(advert),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, kept = adverts.len(), "records missing required fields");
    }
    let columns = ColumnSet::of(&adverts);
    NormalizedBatch {
        adverts,
        columns,
        dropped,
    }
}

/// Normalizes one record, or `None` if a required field is missing.
#[must_use]
pub fn normalize_record(record: &RawRecord) -> Option<Advert> {
    let mut fields: HashMap<Column, &Value> = HashMap::new();
    for (key, value) in record {
        if value.is_null() {
            continue;
        }
        if let Some(column) = Column::from_upstream(&canonical_key(key)) {
            fields.entry(column).or_insert(value);
        }
    }

    let get = |column: Column| fields.get(&column).copied();
    let text = |column: Column| get(column).and_then(as_text);
    let float = |column: Column| get(column).and_then(as_f64);
    let int = |column: Column| get(column).and_then(as_i64);
    let flag = |column: Column| get(column).and_then(as_bool);
    let scale = |column: Column| int(column).and_then(|v| i32::try_from(v).ok());

    let mut advert = Advert::new(
        text(Column::Id)?,
        Direction::from(text(Column::Direction)?.as_str()),
        text(Column::Asset)?,
        text(Column::FiatUnit)?,
        float(Column::Price)?,
        get(Column::Timestamp).and_then(as_timestamp)?,
    );

    advert.fiat_symbol = text(Column::FiatSymbol);
    advert.classify = text(Column::Classify);
    advert.tradable_quantity = float(Column::TradableQuantity);
    advert.surplus_amount = float(Column::SurplusAmount);
    advert.min_single_trans_amount = float(Column::MinSingleTransAmount);
    advert.max_single_trans_amount = float(Column::MaxSingleTransAmount);
    advert.dynamic_max_single_trans_amount = float(Column::DynamicMaxSingleTransAmount);
    advert.min_single_trans_quantity = float(Column::MinSingleTransQuantity);
    advert.max_single_trans_quantity = float(Column::MaxSingleTransQuantity);
    advert.dynamic_max_single_trans_quantity = float(Column::DynamicMaxSingleTransQuantity);
    advert.pay_time_limit = int(Column::PayTimeLimit);
    advert.kyc_required = flag(Column::KycRequired);
    advert.is_tradable = flag(Column::IsTradable);
    advert.is_safe_payment = flag(Column::IsSafePayment);
    advert.asset_scale = scale(Column::AssetScale);
    advert.fiat_scale = scale(Column::FiatScale);
    advert.price_scale = scale(Column::PriceScale);
    advert.source = text(Column::Source);
    advert.num_transactions = int(Column::NumTransactions).and_then(|v| u64::try_from(v).ok());
    Some(advert)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|v: &f64| v.is_finite())
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

/// Epoch seconds, epoch milliseconds, or RFC 3339, truncated to whole seconds.
fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Value::String(s) = value
        && let Ok(dt) = DateTime::parse_from_rfc3339(s.trim())
    {
        return DateTime::from_timestamp(dt.timestamp(), 0);
    }
    let raw = as_i64(value)?;
    let secs = if raw.abs() >= MILLIS_THRESHOLD {
        raw.div_euclid(1000)
    } else {
        raw
    };
    DateTime::from_timestamp(secs, 0)
}
