//! PHP-style coercions on template values

use crate::util;
use minijinja::value::{Value, ValueKind};
use minijinja::{Error, ErrorKind};

/// String form of a value; undefined and none are empty, like PHP's null
pub fn text(value: &Value) -> String {
    if value.is_undefined() || value.is_none() {
        String::new()
    } else {
        value.to_string()
    }
}

/// `intval`
pub fn to_i64(value: &Value) -> i64 {
    match value.kind() {
        ValueKind::Number => i64::try_from(value.clone())
            .or_else(|_| f64::try_from(value.clone()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        ValueKind::Bool => i64::from(value.is_true()),
        ValueKind::String => value.as_str().map(util::leading_int).unwrap_or(0),
        ValueKind::Seq | ValueKind::Map => i64::from(value.len().unwrap_or(0) > 0),
        _ => 0,
    }
}

/// `floatval`
pub fn to_f64(value: &Value) -> f64 {
    match value.kind() {
        ValueKind::Number => f64::try_from(value.clone()).unwrap_or(0.0),
        ValueKind::Bool => f64::from(u8::from(value.is_true())),
        ValueKind::String => value.as_str().map(util::leading_float).unwrap_or(0.0),
        _ => to_i64(value) as f64,
    }
}

/// Integral floats become integers so `3.0` prints as `3`, as PHP does
pub fn number(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        Value::from(f as i64)
    } else {
        Value::from(f)
    }
}

/// Values of a sequence or map. Null iterates as empty.
pub fn collection_values(value: &Value) -> Result<Vec<Value>, Error> {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Ok(Vec::new()),
        ValueKind::Map => value
            .try_iter()?
            .map(|key| value.get_item(&key))
            .collect(),
        ValueKind::Seq | ValueKind::Iterable => Ok(value.try_iter()?.collect()),
        other => Err(not_iterable(other)),
    }
}

/// Keys of a map, or indices of a sequence
pub fn collection_keys(value: &Value) -> Result<Vec<Value>, Error> {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Ok(Vec::new()),
        ValueKind::Map => Ok(value.try_iter()?.collect()),
        ValueKind::Seq | ValueKind::Iterable => Ok((0..value.try_iter()?.count())
            .map(Value::from)
            .collect()),
        other => Err(not_iterable(other)),
    }
}

/// `[key, value]` pairs, indices standing in for keys on sequences
pub fn collection_pairs(value: &Value) -> Result<Vec<Value>, Error> {
    let keys = collection_keys(value)?;
    let values = collection_values(value)?;
    Ok(keys
        .into_iter()
        .zip(values)
        .map(|(key, value)| Value::from(vec![key, value]))
        .collect())
}

fn not_iterable(kind: ValueKind) -> Error {
    Error::new(
        ErrorKind::InvalidOperation,
        format!("cannot iterate over a value of type {:?}", kind),
    )
}
