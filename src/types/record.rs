//! Flat key/value records — the only shape the stores accept.
//!
//! The Agent Store and Log Sink persist documents whose metadata is limited
//! to flat string-keyed scalar fields. Complex values (tool lists, contexts,
//! tool-call traces) travel as JSON-in-a-string. All encode/decode between
//! typed entities and this shape happens at the store boundary; flat values
//! never leak into engine logic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A flat record: ordered string keys, scalar values only.
pub type FlatRecord = BTreeMap<String, FlatValue>;

/// A scalar value in a flat record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FlatValue {
    Flag(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FlatValue {
    /// Read as text. Non-text scalars are rendered; missing semantics are
    /// the caller's (use [`get_str`] on a record).
    pub fn as_text(&self) -> String {
        match self {
            FlatValue::Text(s) => s.clone(),
            FlatValue::Integer(i) => i.to_string(),
            FlatValue::Float(f) => f.to_string(),
            FlatValue::Flag(b) => b.to_string(),
        }
    }
}

impl From<&str> for FlatValue {
    fn from(v: &str) -> Self {
        FlatValue::Text(v.to_string())
    }
}

impl From<String> for FlatValue {
    fn from(v: String) -> Self {
        FlatValue::Text(v)
    }
}

impl From<i64> for FlatValue {
    fn from(v: i64) -> Self {
        FlatValue::Integer(v)
    }
}

impl From<u32> for FlatValue {
    fn from(v: u32) -> Self {
        FlatValue::Integer(v as i64)
    }
}

impl From<f64> for FlatValue {
    fn from(v: f64) -> Self {
        FlatValue::Float(v)
    }
}

impl From<bool> for FlatValue {
    fn from(v: bool) -> Self {
        FlatValue::Flag(v)
    }
}

/// Read a string field; empty string when absent.
pub fn get_str(record: &FlatRecord, key: &str) -> String {
    record.get(key).map(FlatValue::as_text).unwrap_or_default()
}

/// Read an integer field defensively.
///
/// A malformed stored value must not crash a read: anything that does not
/// parse decodes to zero with a warning.
pub fn get_i64(record: &FlatRecord, key: &str) -> i64 {
    match record.get(key) {
        Some(FlatValue::Integer(i)) => *i,
        Some(FlatValue::Float(f)) => *f as i64,
        Some(FlatValue::Text(s)) => s.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %s, "malformed integer field, defaulting to 0");
            0
        }),
        Some(FlatValue::Flag(_)) | None => 0,
    }
}

/// Read a float field defensively; malformed values decode to zero.
pub fn get_f64(record: &FlatRecord, key: &str) -> f64 {
    match record.get(key) {
        Some(FlatValue::Float(f)) => *f,
        Some(FlatValue::Integer(i)) => *i as f64,
        Some(FlatValue::Text(s)) => s.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %s, "malformed float field, defaulting to 0");
            0.0
        }),
        Some(FlatValue::Flag(_)) | None => 0.0,
    }
}

/// Read a boolean field defensively; anything but `true` is false.
pub fn get_bool(record: &FlatRecord, key: &str) -> bool {
    match record.get(key) {
        Some(FlatValue::Flag(b)) => *b,
        Some(FlatValue::Text(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
