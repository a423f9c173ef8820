//! Value codec for the `value` column
//!
//! Numbers are stored as native SQL numbers so counters can be updated with
//! plain arithmetic inside a statement. Every other value is stored as its
//! JSON text and parsed back on read. List and hash documents hold elements
//! that were encoded the same way: numbers as JSON numbers, everything else
//! as a JSON string carrying the element's encoded text.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use super::backend::SqlValue;
use crate::error::{CommandError, Result};

/// Encode a value for the `value` column.
///
/// `None` stands for an absent value and is stored as JSON `null`.
pub fn encode(value: Option<&Value>) -> Result<SqlValue> {
    let value = match value {
        Some(value) => value,
        None => return Ok(SqlValue::Text("null".to_string())),
    };

    match value {
        Value::Number(n) => Ok(encode_number(n)),
        other => Ok(SqlValue::Text(serde_json::to_string(other)?)),
    }
}

/// Encode any serializable value
pub fn encode_serialize<T: Serialize + ?Sized>(value: &T) -> Result<SqlValue> {
    let value = serde_json::to_value(value)?;
    encode(Some(&value))
}

fn encode_number(n: &Number) -> SqlValue {
    if let Some(i) = n.as_i64() {
        SqlValue::Integer(i)
    } else if n.is_f64() {
        // Finite by construction; serde_json numbers are never NaN
        SqlValue::Real(n.as_f64().unwrap_or_default())
    } else {
        // u64 above i64::MAX: keep it exact as text
        SqlValue::Text(n.to_string())
    }
}

/// Decode a stored cell
pub fn decode(stored: SqlValue) -> Result<Value> {
    match stored {
        SqlValue::Text(text) => Ok(serde_json::from_str(&text)?),
        SqlValue::Integer(n) => Ok(Value::from(n)),
        SqlValue::Real(f) => Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)),
        SqlValue::Null => Ok(Value::Null),
    }
}

/// Decode a stored cell into a concrete type
pub fn decode_deserialize<T: DeserializeOwned>(stored: SqlValue) -> Result<T> {
    Ok(serde_json::from_value(decode(stored)?)?)
}

/// Decode one element taken out of a list or hash document
fn decode_element(element: Value) -> Result<Value> {
    match element {
        Value::String(text) => decode(SqlValue::Text(text)),
        other => Ok(other),
    }
}

/// Decode a whole list document
pub fn decode_list(stored: SqlValue) -> Result<Vec<Value>> {
    match decode_document(stored)? {
        Value::Array(elements) => elements.into_iter().map(decode_element).collect(),
        _ => Err(CommandError::WrongType.into()),
    }
}

/// Decode a whole hash document
pub fn decode_hash(stored: SqlValue) -> Result<Map<String, Value>> {
    match decode_document(stored)? {
        Value::Object(fields) => fields
            .into_iter()
            .map(|(field, value)| Ok((field, decode_element(value)?)))
            .collect(),
        _ => Err(CommandError::WrongType.into()),
    }
}

fn decode_document(stored: SqlValue) -> Result<Value> {
    match stored {
        SqlValue::Text(text) => Ok(serde_json::from_str(&text)?),
        _ => Err(CommandError::WrongType.into()),
    }
}
