//! Normalization of heterogeneous success envelopes.
//!
//! Servers answer either with the payload itself or wrapped as
//! `{ "data": payload, ... }`. Every single-object response goes through
//! `unwrap_data`; list responses go through `normalize_list`, which never
//! fails: shape mismatches give an empty page and undecodable items are
//! skipped.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::types::Page;

/// Return the `data` member when `body` is an object that has one, otherwise
/// `body` itself.
pub fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Parse a response body leniently: an empty body is `null`, and text that
/// is not JSON is kept as a JSON string.
pub fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Normalize the three accepted list shapes into a page.
///
/// - a bare array: total is its length;
/// - `{data: [...], total: n}`: total is `n`;
/// - `{data: [...]}` or a non-numeric `total`: total is the array length.
///
/// A missing or non-array `data`, or any other body, gives an empty page.
/// Items that do not decode as `T` are skipped with a warning; without an
/// explicit total, total counts the records kept.
pub fn normalize_list<T: DeserializeOwned>(body: Value) -> Page<T> {
    match body {
        Value::Array(items) => {
            let records = decode_items::<T>(items);
            Page {
                total: records.len(),
                records,
                message: None,
            }
        }
        Value::Object(map) if map.contains_key("data") => normalize_envelope(map),
        other => {
            warn!(shape = shape_name(&other), "list response has no data array, treating as empty");
            Page::default()
        }
    }
}

fn normalize_envelope<T: DeserializeOwned>(mut map: Map<String, Value>) -> Page<T> {
    let message = match map.remove("message") {
        Some(Value::String(message)) => Some(message),
        _ => None,
    };

    let items = match map.remove("data") {
        Some(Value::Array(items)) => items,
        other => {
            let shape = other.as_ref().map_or("missing", shape_name);
            warn!(shape = shape, "list envelope data is not an array, treating as empty");
            return Page {
                message,
                ..Page::default()
            };
        }
    };

    let records = decode_items::<T>(items);
    let total = map
        .get("total")
        .and_then(Value::as_u64)
        .and_then(|total| usize::try_from(total).ok())
        .unwrap_or(records.len());
    Page {
        records,
        total,
        message,
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(index = index, error = %err, "skipping list item that does not decode");
                None
            }
        })
        .collect()
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
