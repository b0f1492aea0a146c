//! Normalization of loosely typed backend payloads.
//!
//! The backend sends product references either as a plain id or as a
//! populated product document, and numbers that may be missing, quoted, or
//! garbage. Everything is resolved here so the engine only ever sees plain
//! ids and non-negative numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// Resolves a product reference to its id.
///
/// Accepts a string id, a numeric id, or a populated document carrying
/// `_id`, `id` or an extended-JSON `$oid`. Returns `None` when nothing usable
/// is found.
pub fn resolve_product_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(doc) => doc
            .get("_id")
            .or_else(|| doc.get("id"))
            .or_else(|| doc.get("$oid"))
            .and_then(resolve_product_id),
        _ => None,
    }
}

/// A non-negative amount, or `None` for anything else.
pub fn amount_from_value(value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }?;
    (parsed >= Decimal::ZERO).then_some(parsed)
}

/// A whole count; fractional input is truncated. Negative values are kept
/// so callers can decide what a negative request means.
pub fn count_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn truncate(f: f64) -> Option<i64> {
    f.is_finite().then(|| f.trunc() as i64)
}

fn non_negative(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}

pub(crate) fn product_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(resolve_product_id(&value).unwrap_or_default())
}

pub(crate) fn amount<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    Ok(optional_amount(d)?.unwrap_or(Decimal::ZERO))
}

pub(crate) fn optional_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(amount_from_value(&value))
}

pub(crate) fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(optional_count(d)?.unwrap_or(0))
}

pub(crate) fn optional_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(count_from_value(&value).map(non_negative))
}
