//! Type conversion utilities for SQLite.
//!
//! SQLite has no date type; dates and date-times are bound as ISO text so
//! they compare correctly against ISO text columns.

use rusqlite::types::{Value, ValueRef};
use serde_json::Value as JsonValue;

use sieve_query::value::FilterValue;

/// Text format of bound dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Text format of bound date-times.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Convert a FilterValue to a SQLite Value.
pub fn filter_value_to_sqlite(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::Null,
        FilterValue::Bool(b) => Value::Integer(i64::from(*b)),
        FilterValue::Int(i) => Value::Integer(*i),
        FilterValue::Float(f) => Value::Real(*f),
        FilterValue::String(s) => Value::Text(s.clone()),
        FilterValue::Date(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
        FilterValue::DateTime(dt) => Value::Text(dt.format(DATETIME_FORMAT).to_string()),
        FilterValue::Json(j) => Value::Text(j.to_string()),
        // Lists are expanded into separate placeholders before binding; a
        // list that still reaches here is stored as a JSON array.
        FilterValue::List(_) => Value::Text(serde_json::to_string(value).unwrap_or_default()),
    }
}

/// Convert a SQLite ValueRef to a JSON Value.
pub fn from_sqlite_value(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s.to_string()),
            Err(_) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
        },
    }
}

/// Get a JSON value from a row at the given column index.
pub fn get_value_at_index(row: &rusqlite::Row<'_>, index: usize) -> JsonValue {
    row.get_ref(index)
        .map(from_sqlite_value)
        .unwrap_or(JsonValue::Null)
}
