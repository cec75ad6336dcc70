//! Generic values and conversion to and from the engine's native values
//!
//! [`Value`] is the single dynamic representation used by schemas, graph
//! elements and query results. [`codec`] converts it to and from
//! [`NativeValue`].

pub mod codec;
pub mod native;

pub use codec::{coerce, decode, decode_typed, encode, literal, quote, to_native, CodecError, CodecResult};
pub use native::{Interval, LogicalType, NativeValue, NodeVal, RelVal};

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generic value
///
/// Graph-native results keep their shape: a node or rel is a flat map of its
/// properties merged with the `id`/`label` (and `src`/`dst`) metadata keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Interval(Interval),
    List(Vec<Value>),
    Struct(IndexMap<String, Value>),
    Map(IndexMap<String, Value>),
    Node(IndexMap<String, Value>),
    Rel(IndexMap<String, Value>),
    Path { nodes: Vec<Value>, rels: Vec<Value> },
    /// Placeholder for a column whose native type has no conversion
    Unsupported { type_name: String },
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Field lookup on map-shaped values (struct, map, node, rel)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(m) | Value::Map(m) | Value::Node(m) | Value::Rel(m) => m.get(key),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::Date(_) => "DATE",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::Interval(_) => "INTERVAL",
            Value::List(_) => "LIST",
            Value::Struct(_) => "STRUCT",
            Value::Map(_) => "MAP",
            Value::Node(_) => "NODE",
            Value::Rel(_) => "REL",
            Value::Path { .. } => "PATH",
            Value::Unsupported { .. } => "UNSUPPORTED",
        }
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Value::Timestamp(ts) => Json::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::Interval(i) => serde_json::json!({
                "months": i.months,
                "days": i.days,
                "micros": i.micros,
            }),
            Value::List(items) => Json::Array(items.iter().map(|v| v.to_json()).collect()),
            Value::Struct(m) | Value::Map(m) | Value::Node(m) | Value::Rel(m) => Json::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Path { nodes, rels } => serde_json::json!({
                "nodes": nodes.iter().map(|v| v.to_json()).collect::<Vec<_>>(),
                "rels": rels.iter().map(|v| v.to_json()).collect::<Vec<_>>(),
            }),
            Value::Unsupported { type_name } => serde_json::json!({ "unsupported": type_name }),
        }
    }

    /// Build a value from JSON. Objects become [`Value::Map`].
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(obj) => Value::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Interval(i) => write!(f, "{}", i),
            Value::Unsupported { type_name } => write!(f, "<unsupported {}>", type_name),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from("a"), Value::String("a".to_string()));
        assert_eq!(Value::from(3), Value::Integer(3));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(vec![1, 2]), Value::List(vec![Value::Integer(1), Value::Integer(2)]));
    }

    #[test]
    fn test_json_conversion() {
        let mut m = IndexMap::new();
        m.insert("name".to_string(), Value::from("Alice"));
        m.insert("age".to_string(), Value::from(30));
        let v = Value::Map(m);

        let json = v.to_json();
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["age"], 30);
        assert_eq!(Value::from_json(&json), v);
    }

    #[test]
    fn test_nan_becomes_json_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_map_lookup() {
        let mut m = IndexMap::new();
        m.insert("id".to_string(), Value::from("n1"));
        let node = Value::Node(m);
        assert_eq!(node.get("id"), Some(&Value::from("n1")));
        assert_eq!(Value::Integer(1).get("id"), None);
    }
}
