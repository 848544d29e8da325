//! Firestore typed values <-> plain JSON.
//!
//! The REST API wraps every value (`{"integerValue": "42"}`, `{"mapValue": {"fields": …}}`).
//! Domain decoding works on plain JSON, so conversion happens here and nowhere else.

use crate::domain::Fields;
use serde_json::{Map, Value, json};

/// Unwrap one typed Firestore value. Unknown wrappers become `null`.
pub fn from_firestore(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Value::Null;
    };
    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" | "doubleValue" => inner.clone(),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(s.clone())),
            other => other.clone(),
        },
        "geoPointValue" => json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        }),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(from_firestore).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(fields_from_firestore)
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

/// Unwrap a document's `fields` object.
pub fn fields_from_firestore(fields: &Map<String, Value>) -> Fields {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), from_firestore(v)))
        .collect()
}

/// `{latitude, longitude}` with nothing else is written as a geo point.
fn as_geo_point(obj: &Map<String, Value>) -> Option<Value> {
    if obj.len() != 2 {
        return None;
    }
    let lat = obj.get("latitude")?.as_f64()?;
    let lon = obj.get("longitude")?.as_f64()?;
    Some(json!({ "geoPointValue": { "latitude": lat, "longitude": lon } }))
}

/// Wrap plain JSON into a typed Firestore value.
pub fn to_firestore(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or(0.0) })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(to_firestore).collect::<Vec<_>>() } })
        }
        Value::Object(obj) => as_geo_point(obj)
            .unwrap_or_else(|| json!({ "mapValue": { "fields": fields_to_firestore(obj) } })),
    }
}

pub fn fields_to_firestore(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), to_firestore(v)))
        .collect()
}

/// Last path segment of a document resource name.
pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
