//! Conversion between [`NativeValue`] and [`Value`]
//!
//! `decode` is exact and fails with [`CodecError::Unsupported`] for native
//! kinds that have no generic counterpart. `encode` is strict and type
//! directed; `coerce` is its lenient counterpart applied on load.

use super::native::{LogicalType, NativeValue, NodeVal, RelVal};
use super::Value;
use crate::schema::PropertyType;
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use thiserror::Error;

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Native kind without a conversion
    #[error("Unsupported native type: {0}")]
    Unsupported(String),

    /// Value not representable as the declared property type
    #[error("Cannot encode {found} as {expected}")]
    Coercion {
        expected: PropertyType,
        found: String,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Decode a native value into a generic value
pub fn decode(native: &NativeValue) -> CodecResult<Value> {
    let value = match native {
        NativeValue::Null(_) => Value::Null,
        NativeValue::Bool(b) => Value::Bool(*b),
        NativeValue::Int8(v) => Value::Integer(*v as i64),
        NativeValue::Int16(v) => Value::Integer(*v as i64),
        NativeValue::Int32(v) => Value::Integer(*v as i64),
        NativeValue::Int64(v) => Value::Integer(*v),
        // Widened to text so no precision is lost
        NativeValue::Int128(v) => Value::String(v.to_string()),
        NativeValue::UInt8(v) => Value::Integer(*v as i64),
        NativeValue::UInt16(v) => Value::Integer(*v as i64),
        NativeValue::UInt32(v) => Value::Integer(*v as i64),
        NativeValue::UInt64(v) => match i64::try_from(*v) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::String(v.to_string()),
        },
        NativeValue::Float(v) => Value::Float(*v as f64),
        NativeValue::Double(v) => Value::Float(*v),
        NativeValue::String(s) => Value::String(s.clone()),
        NativeValue::Blob(bytes) => Value::Bytes(bytes.clone()),
        NativeValue::Uuid(u) => Value::String(u.to_string()),
        NativeValue::Decimal(d) => Value::String(d.clone()),
        NativeValue::Date(d) => Value::Date(*d),
        NativeValue::Timestamp(ts) => Value::Timestamp(*ts),
        NativeValue::Interval(i) => Value::Interval(*i),
        NativeValue::List(_, items) | NativeValue::Array(_, items) => {
            Value::List(items.iter().map(decode).collect::<CodecResult<_>>()?)
        }
        NativeValue::Struct(fields) => Value::Struct(decode_fields(fields)?),
        NativeValue::Map(_, _, entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for (k, v) in entries {
                map.insert(map_key(k)?, decode(v)?);
            }
            Value::Map(map)
        }
        NativeValue::Node(node) => decode_node(node)?,
        NativeValue::Rel(rel) => decode_rel(rel)?,
        NativeValue::RecursiveRel { nodes, rels } => Value::Path {
            nodes: nodes.iter().map(decode_node).collect::<CodecResult<_>>()?,
            rels: rels.iter().map(decode_rel).collect::<CodecResult<_>>()?,
        },
        NativeValue::Union(..) | NativeValue::InternalId { .. } => {
            return Err(CodecError::Unsupported(native.logical_type().to_string()))
        }
    };
    Ok(value)
}

/// Decode, then coerce to the declared property type
pub fn decode_typed(native: &NativeValue, ty: PropertyType) -> CodecResult<Value> {
    decode(native).map(|v| coerce(v, ty))
}

fn decode_fields(fields: &[(String, NativeValue)]) -> CodecResult<IndexMap<String, Value>> {
    let mut map = IndexMap::with_capacity(fields.len());
    for (k, v) in fields {
        map.insert(k.clone(), decode(v)?);
    }
    Ok(map)
}

fn map_key(key: &NativeValue) -> CodecResult<String> {
    match key {
        NativeValue::String(s) => Ok(s.clone()),
        k if k.is_numeric() || matches!(k, NativeValue::Bool(_) | NativeValue::Date(_) | NativeValue::Uuid(_)) => {
            Ok(k.to_string())
        }
        other => Err(CodecError::Unsupported(format!("MAP key {}", other.logical_type()))),
    }
}

// Metadata keys take precedence over a property of the same name.
fn decode_node(node: &NodeVal) -> CodecResult<Value> {
    let mut map = IndexMap::with_capacity(node.properties.len() + 2);
    map.insert("id".to_string(), Value::String(node.id.clone()));
    map.insert("label".to_string(), Value::String(node.label.clone()));
    for (k, v) in &node.properties {
        if !map.contains_key(k) {
            map.insert(k.clone(), decode(v)?);
        }
    }
    Ok(Value::Node(map))
}

fn decode_rel(rel: &RelVal) -> CodecResult<Value> {
    let mut map = IndexMap::with_capacity(rel.properties.len() + 4);
    map.insert("id".to_string(), Value::String(rel.id.clone()));
    map.insert("label".to_string(), Value::String(rel.label.clone()));
    map.insert("src".to_string(), Value::String(rel.src.clone()));
    map.insert("dst".to_string(), Value::String(rel.dst.clone()));
    for (k, v) in &rel.properties {
        if !map.contains_key(k) {
            map.insert(k.clone(), decode(v)?);
        }
    }
    Ok(Value::Rel(map))
}

/// Encode a generic value as the native value stored for `ty`.
///
/// Composite types are stored as JSON text. Anything that does not fit the
/// declared type is rejected.
pub fn encode(value: &Value, ty: PropertyType) -> CodecResult<NativeValue> {
    let mismatch = || CodecError::Coercion {
        expected: ty,
        found: value.type_name().to_string(),
    };

    if value.is_null() {
        return Ok(NativeValue::Null(ty.native_type()));
    }

    let native = match ty {
        PropertyType::Text | PropertyType::LongText | PropertyType::Image => match value {
            Value::String(s) => NativeValue::String(s.clone()),
            _ => return Err(mismatch()),
        },
        PropertyType::Number => match value {
            Value::Integer(i) => NativeValue::Int64(*i),
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            Value::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                NativeValue::Int64(*f as i64)
            }
            _ => return Err(mismatch()),
        },
        PropertyType::Boolean => match value {
            Value::Bool(b) => NativeValue::Bool(*b),
            _ => return Err(mismatch()),
        },
        PropertyType::Date => match value {
            Value::Date(d) => NativeValue::Date(*d),
            Value::String(s) => NativeValue::Date(parse_date(s).ok_or_else(mismatch)?),
            _ => return Err(mismatch()),
        },
        PropertyType::Timestamp => match value {
            Value::Timestamp(ts) => NativeValue::Timestamp(*ts),
            Value::String(s) => NativeValue::Timestamp(parse_timestamp(s).ok_or_else(mismatch)?),
            _ => return Err(mismatch()),
        },
        PropertyType::Interval => match value {
            Value::Interval(i) => NativeValue::Interval(*i),
            _ => return Err(mismatch()),
        },
        PropertyType::List | PropertyType::Vector => match value {
            Value::List(_) => NativeValue::String(value.to_json().to_string()),
            Value::String(s) if parse_json(s).map_or(false, |j| j.is_array()) => {
                NativeValue::String(s.clone())
            }
            _ => return Err(mismatch()),
        },
        PropertyType::Map | PropertyType::Struct => match value {
            Value::Map(_) | Value::Struct(_) => NativeValue::String(value.to_json().to_string()),
            Value::String(s) if parse_json(s).map_or(false, |j| j.is_object()) => {
                NativeValue::String(s.clone())
            }
            _ => return Err(mismatch()),
        },
    };
    Ok(native)
}

/// Best-effort conversion of a loaded value to the declared property type.
///
/// Values that cannot be converted are returned unchanged.
pub fn coerce(value: Value, ty: PropertyType) -> Value {
    match (ty, value) {
        (_, Value::Null) => Value::Null,

        (PropertyType::Text | PropertyType::LongText | PropertyType::Image, v) => match v {
            Value::String(s) => Value::String(s),
            unsupported @ Value::Unsupported { .. } => unsupported,
            other => Value::String(other.to_string()),
        },

        (PropertyType::Number, Value::Float(f)) if f.is_finite() => Value::Integer(f.trunc() as i64),
        (PropertyType::Number, Value::Bool(b)) => Value::Integer(b as i64),
        (PropertyType::Number, Value::String(s)) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Value::Integer(i)
            } else if let Ok(f) = trimmed.parse::<f64>() {
                coerce(Value::Float(f), ty)
            } else {
                Value::String(s)
            }
        }

        (PropertyType::Boolean, Value::Integer(i)) => Value::Bool(i != 0),
        (PropertyType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(s),
        },

        (PropertyType::Date, Value::Timestamp(ts)) => Value::Date(ts.date()),
        (PropertyType::Date, Value::String(s)) => match parse_date(&s) {
            Some(d) => Value::Date(d),
            None => Value::String(s),
        },

        (PropertyType::Timestamp, Value::Date(d)) => Value::Timestamp(d.and_time(chrono::NaiveTime::MIN)),
        (PropertyType::Timestamp, Value::String(s)) => match parse_timestamp(&s) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::String(s),
        },

        (PropertyType::List, Value::String(s)) => match parse_json(&s) {
            Some(json @ serde_json::Value::Array(_)) => Value::from_json(&json),
            _ => Value::String(s),
        },
        (PropertyType::Vector, Value::String(s)) => match parse_json(&s) {
            Some(json @ serde_json::Value::Array(_)) => coerce(Value::from_json(&json), ty),
            _ => Value::String(s),
        },
        (PropertyType::Vector, Value::List(items)) => Value::List(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Integer(i) => Value::Float(i as f64),
                    other => other,
                })
                .collect(),
        ),

        (PropertyType::Map | PropertyType::Struct, Value::String(s)) => match parse_json(&s) {
            Some(json @ serde_json::Value::Object(_)) => coerce(Value::from_json(&json), ty),
            _ => Value::String(s),
        },
        (PropertyType::Map, Value::Struct(m)) => Value::Map(m),
        (PropertyType::Struct, Value::Map(m)) => Value::Struct(m),

        (_, v) => v,
    }
}

/// Render a native value as a literal of the query language.
///
/// Temporal values are rendered as quoted text; the engine casts them to the
/// target column type.
pub fn literal(native: &NativeValue) -> String {
    match native {
        NativeValue::Null(_) => "NULL".to_string(),
        NativeValue::Bool(b) => b.to_string(),
        NativeValue::Float(f) => float_literal(*f as f64),
        NativeValue::Double(f) => float_literal(*f),
        NativeValue::Decimal(d) => d.clone(),
        v if v.is_numeric() => v.to_string(),
        NativeValue::String(s) => quote(s),
        NativeValue::List(_, items) | NativeValue::Array(_, items) => {
            let inner: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", inner.join(", "))
        }
        NativeValue::Struct(fields) => {
            let inner: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        NativeValue::Node(n) => quote(&n.id),
        NativeValue::Rel(r) => quote(&r.id),
        other => quote(&other.to_string()),
    }
}

fn float_literal(f: f64) -> String {
    if f.is_finite() {
        format!("{:?}", f)
    } else {
        "NULL".to_string()
    }
}

/// Single-quote and escape a string for inclusion in query text
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| parse_date(s).map(|d| d.and_time(chrono::NaiveTime::MIN)))
}

fn parse_json(s: &str) -> Option<serde_json::Value> {
    serde_json::from_str(s).ok()
}

/// Native value for an untyped generic value (query parameters)
pub fn to_native(value: &Value) -> NativeValue {
    match value {
        Value::Null => NativeValue::Null(LogicalType::Any),
        Value::Bool(b) => NativeValue::Bool(*b),
        Value::Integer(i) => NativeValue::Int64(*i),
        Value::Float(f) => NativeValue::Double(*f),
        Value::String(s) => NativeValue::String(s.clone()),
        Value::Bytes(b) => NativeValue::Blob(b.clone()),
        Value::Date(d) => NativeValue::Date(*d),
        Value::Timestamp(ts) => NativeValue::Timestamp(*ts),
        Value::Interval(i) => NativeValue::Interval(*i),
        Value::List(items) => {
            let natives: Vec<NativeValue> = items.iter().map(to_native).collect();
            let elem = natives
                .iter()
                .find(|n| !n.is_null())
                .map(|n| n.logical_type())
                .unwrap_or(LogicalType::Any);
            NativeValue::List(elem, natives)
        }
        Value::Struct(m) | Value::Map(m) | Value::Node(m) | Value::Rel(m) => {
            NativeValue::Struct(m.iter().map(|(k, v)| (k.clone(), to_native(v))).collect())
        }
        Value::Path { .. } | Value::Unsupported { .. } => NativeValue::Null(LogicalType::Any),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Interval;

    fn round_trip(v: Value, ty: PropertyType) -> Value {
        let native = encode(&v, ty).unwrap();
        decode_typed(&native, ty).unwrap()
    }

    #[test]
    fn test_round_trip_scalars() {
        assert_eq!(round_trip(Value::from("it's \"quoted\""), PropertyType::Text), Value::from("it's \"quoted\""));
        assert_eq!(round_trip(Value::from(i64::MAX), PropertyType::Number), Value::Integer(i64::MAX));
        assert_eq!(round_trip(Value::from(i64::MIN), PropertyType::Number), Value::Integer(i64::MIN));
        assert_eq!(round_trip(Value::from(0), PropertyType::Number), Value::Integer(0));
        assert_eq!(round_trip(Value::from(true), PropertyType::Boolean), Value::Bool(true));
        assert_eq!(round_trip(Value::Null, PropertyType::Date), Value::Null);

        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert_eq!(round_trip(Value::Date(date), PropertyType::Date), Value::Date(date));
        let interval = Value::Interval(Interval::new(1, 2, 3));
        assert_eq!(round_trip(interval.clone(), PropertyType::Interval), interval);
    }

    #[test]
    fn test_round_trip_composites() {
        let vector = Value::List(vec![Value::Float(0.5), Value::Float(1.0), Value::Float(-2.25)]);
        assert_eq!(round_trip(vector.clone(), PropertyType::Vector), vector);

        let list = Value::List(vec![Value::from(1), Value::from("two")]);
        assert_eq!(round_trip(list.clone(), PropertyType::List), list);

        let mut m = IndexMap::new();
        m.insert("b".to_string(), Value::from(2));
        m.insert("a".to_string(), Value::from("x"));
        let map = Value::Map(m);
        assert_eq!(round_trip(map.clone(), PropertyType::Map), map);

        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), Value::from(1));
        fields.insert("inner".to_string(), map);
        let record = Value::Struct(fields);
        assert_eq!(round_trip(record.clone(), PropertyType::Struct), record);
        assert_eq!(PropertyType::Struct.default_value(), Value::Struct(IndexMap::new()));
    }

    #[test]
    fn test_encode_rejects_floats_outside_int64() {
        assert_eq!(encode(&Value::Float(42.0), PropertyType::Number).unwrap(), NativeValue::Int64(42));
        for f in [1e300, -1e300, 9.223372036854775807e18, f64::INFINITY, f64::NAN] {
            let err = encode(&Value::Float(f), PropertyType::Number).unwrap_err();
            assert!(matches!(err, CodecError::Coercion { expected: PropertyType::Number, .. }), "{}", f);
        }
        assert_eq!(
            encode(&Value::Float(i64::MIN as f64), PropertyType::Number).unwrap(),
            NativeValue::Int64(i64::MIN)
        );
    }

    #[test]
    fn test_composites_are_stored_as_json_text() {
        let native = encode(&Value::from(vec![1, 2]), PropertyType::List).unwrap();
        assert_eq!(native, NativeValue::String("[1,2]".to_string()));
    }

    #[test]
    fn test_encode_rejects_mismatched_types() {
        let err = encode(&Value::from("thirty"), PropertyType::Number).unwrap_err();
        assert!(matches!(err, CodecError::Coercion { expected: PropertyType::Number, .. }));
        assert!(encode(&Value::from(1), PropertyType::Boolean).is_err());
        assert!(encode(&Value::from("not json"), PropertyType::Map).is_err());
    }

    #[test]
    fn test_decode_widens_int128() {
        let big = i128::MAX;
        assert_eq!(decode(&NativeValue::Int128(big)).unwrap(), Value::String(big.to_string()));
        assert_eq!(decode(&NativeValue::UInt64(u64::MAX)).unwrap(), Value::String(u64::MAX.to_string()));
        assert_eq!(decode(&NativeValue::Int8(-8)).unwrap(), Value::Integer(-8));
    }

    #[test]
    fn test_decode_null_is_null() {
        assert_eq!(decode(&NativeValue::Null(LogicalType::Int64)).unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_node_metadata_wins() {
        let node = NodeVal {
            id: "alice".to_string(),
            label: "Person".to_string(),
            properties: vec![
                ("label".to_string(), NativeValue::String("shadowed".to_string())),
                ("age".to_string(), NativeValue::Int64(30)),
            ],
        };
        let v = decode(&NativeValue::Node(node)).unwrap();
        assert_eq!(v.get("label"), Some(&Value::from("Person")));
        assert_eq!(v.get("age"), Some(&Value::from(30)));
    }

    #[test]
    fn test_decode_rel_and_path() {
        let rel = RelVal {
            id: "r1".to_string(),
            label: "KNOWS".to_string(),
            src: "a".to_string(),
            dst: "b".to_string(),
            properties: vec![("since".to_string(), NativeValue::Int64(2021))],
        };
        let v = decode(&NativeValue::Rel(rel.clone())).unwrap();
        assert_eq!(v.get("src"), Some(&Value::from("a")));
        assert_eq!(v.get("since"), Some(&Value::from(2021)));

        let path = decode(&NativeValue::RecursiveRel { nodes: vec![], rels: vec![rel] }).unwrap();
        match path {
            Value::Path { nodes, rels } => {
                assert!(nodes.is_empty());
                assert_eq!(rels.len(), 1);
            }
            other => panic!("expected path, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_unsupported_kinds() {
        let union = NativeValue::Union("tag".to_string(), Box::new(NativeValue::Int64(1)));
        assert_eq!(decode(&union), Err(CodecError::Unsupported("UNION".to_string())));

        let id = NativeValue::InternalId { table: 0, offset: 1 };
        assert!(matches!(decode(&id), Err(CodecError::Unsupported(_))));

        let bad_key = NativeValue::Map(
            LogicalType::List(Box::new(LogicalType::Int64)),
            LogicalType::Int64,
            vec![(NativeValue::List(LogicalType::Int64, vec![]), NativeValue::Int64(1))],
        );
        assert!(matches!(decode(&bad_key), Err(CodecError::Unsupported(_))));
    }

    #[test]
    fn test_coerce_is_lenient() {
        assert_eq!(coerce(Value::from("42"), PropertyType::Number), Value::Integer(42));
        assert_eq!(coerce(Value::Float(2.9), PropertyType::Number), Value::Integer(2));
        assert_eq!(coerce(Value::from(5), PropertyType::Text), Value::from("5"));
        assert_eq!(coerce(Value::from("true"), PropertyType::Boolean), Value::Bool(true));
        assert_eq!(coerce(Value::from("abc"), PropertyType::Number), Value::from("abc"));
        assert_eq!(
            coerce(Value::from("2023-01-01"), PropertyType::Timestamp),
            Value::Timestamp(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_literal_escapes_strings() {
        assert_eq!(literal(&NativeValue::String("O'Brien \\ x".to_string())), "'O\\'Brien \\\\ x'");
        assert_eq!(literal(&NativeValue::Int64(-3)), "-3");
        assert_eq!(literal(&NativeValue::Double(2.0)), "2.0");
        assert_eq!(literal(&NativeValue::Null(LogicalType::Any)), "NULL");
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(literal(&NativeValue::Date(date)), "'2024-02-29'");
    }
}
