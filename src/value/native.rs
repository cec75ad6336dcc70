//! Native values of the embedded graph engine
//!
//! These mirror the engine's column and result types one to one. The rest of
//! the crate never inspects them directly; it goes through the codec.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical (column) type of a native value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    Any,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    String,
    Blob,
    Uuid,
    Decimal,
    Date,
    Timestamp,
    Interval,
    List(Box<LogicalType>),
    Array(Box<LogicalType>, usize),
    Struct(Vec<(String, LogicalType)>),
    Map(Box<LogicalType>, Box<LogicalType>),
    Union,
    Node,
    Rel,
    RecursiveRel,
    InternalId,
}

impl LogicalType {
    /// Parse a column type name as written in DDL (`INT64`, `STRING[]`, ...).
    pub fn parse(name: &str) -> Option<LogicalType> {
        let upper = name.trim().to_uppercase();
        if let Some(inner) = upper.strip_suffix("[]") {
            return LogicalType::parse(inner).map(|t| LogicalType::List(Box::new(t)));
        }
        let ty = match upper.as_str() {
            "BOOL" | "BOOLEAN" => LogicalType::Bool,
            "INT8" => LogicalType::Int8,
            "INT16" => LogicalType::Int16,
            "INT32" | "INT" => LogicalType::Int32,
            "INT64" | "SERIAL" => LogicalType::Int64,
            "INT128" => LogicalType::Int128,
            "UINT8" => LogicalType::UInt8,
            "UINT16" => LogicalType::UInt16,
            "UINT32" => LogicalType::UInt32,
            "UINT64" => LogicalType::UInt64,
            "FLOAT" => LogicalType::Float,
            "DOUBLE" => LogicalType::Double,
            "STRING" => LogicalType::String,
            "BLOB" => LogicalType::Blob,
            "UUID" => LogicalType::Uuid,
            "DECIMAL" => LogicalType::Decimal,
            "DATE" => LogicalType::Date,
            "TIMESTAMP" => LogicalType::Timestamp,
            "INTERVAL" => LogicalType::Interval,
            _ => return None,
        };
        Some(ty)
    }

    /// Whether values of this type can be used as a primary key
    pub fn is_key_type(&self) -> bool {
        matches!(
            self,
            LogicalType::String
                | LogicalType::Int8
                | LogicalType::Int16
                | LogicalType::Int32
                | LogicalType::Int64
                | LogicalType::UInt8
                | LogicalType::UInt16
                | LogicalType::UInt32
                | LogicalType::UInt64
                | LogicalType::Uuid
                | LogicalType::Date
        )
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Any => write!(f, "ANY"),
            LogicalType::Bool => write!(f, "BOOL"),
            LogicalType::Int8 => write!(f, "INT8"),
            LogicalType::Int16 => write!(f, "INT16"),
            LogicalType::Int32 => write!(f, "INT32"),
            LogicalType::Int64 => write!(f, "INT64"),
            LogicalType::Int128 => write!(f, "INT128"),
            LogicalType::UInt8 => write!(f, "UINT8"),
            LogicalType::UInt16 => write!(f, "UINT16"),
            LogicalType::UInt32 => write!(f, "UINT32"),
            LogicalType::UInt64 => write!(f, "UINT64"),
            LogicalType::Float => write!(f, "FLOAT"),
            LogicalType::Double => write!(f, "DOUBLE"),
            LogicalType::String => write!(f, "STRING"),
            LogicalType::Blob => write!(f, "BLOB"),
            LogicalType::Uuid => write!(f, "UUID"),
            LogicalType::Decimal => write!(f, "DECIMAL"),
            LogicalType::Date => write!(f, "DATE"),
            LogicalType::Timestamp => write!(f, "TIMESTAMP"),
            LogicalType::Interval => write!(f, "INTERVAL"),
            LogicalType::List(inner) => write!(f, "{}[]", inner),
            LogicalType::Array(inner, n) => write!(f, "{}[{}]", inner, n),
            LogicalType::Struct(fields) => {
                write!(f, "STRUCT(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", name, ty)?;
                }
                write!(f, ")")
            }
            LogicalType::Map(k, v) => write!(f, "MAP({}, {})", k, v),
            LogicalType::Union => write!(f, "UNION"),
            LogicalType::Node => write!(f, "NODE"),
            LogicalType::Rel => write!(f, "REL"),
            LogicalType::RecursiveRel => write!(f, "RECURSIVE_REL"),
            LogicalType::InternalId => write!(f, "INTERNAL_ID"),
        }
    }
}

/// Calendar interval, kept in the engine's months/days/micros split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl Interval {
    pub fn new(months: i32, days: i32, micros: i64) -> Self {
        Interval { months, days, micros }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} months {} days {} micros", self.months, self.days, self.micros)
    }
}

/// A node as returned by the engine: identity, label and its columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeVal {
    pub id: String,
    pub label: String,
    pub properties: Vec<(String, NativeValue)>,
}

/// A relationship as returned by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelVal {
    pub id: String,
    pub label: String,
    pub src: String,
    pub dst: String,
    pub properties: Vec<(String, NativeValue)>,
}

/// Value as produced or consumed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeValue {
    Null(LogicalType),
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
    Uuid(uuid::Uuid),
    /// Exact decimal kept in its textual form
    Decimal(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Interval(Interval),
    List(LogicalType, Vec<NativeValue>),
    Array(LogicalType, Vec<NativeValue>),
    Struct(Vec<(String, NativeValue)>),
    Map(LogicalType, LogicalType, Vec<(NativeValue, NativeValue)>),
    Union(String, Box<NativeValue>),
    Node(NodeVal),
    Rel(RelVal),
    RecursiveRel { nodes: Vec<NodeVal>, rels: Vec<RelVal> },
    InternalId { table: u64, offset: u64 },
}

impl NativeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null(_))
    }

    /// Logical type of this value
    pub fn logical_type(&self) -> LogicalType {
        match self {
            NativeValue::Null(t) => t.clone(),
            NativeValue::Bool(_) => LogicalType::Bool,
            NativeValue::Int8(_) => LogicalType::Int8,
            NativeValue::Int16(_) => LogicalType::Int16,
            NativeValue::Int32(_) => LogicalType::Int32,
            NativeValue::Int64(_) => LogicalType::Int64,
            NativeValue::Int128(_) => LogicalType::Int128,
            NativeValue::UInt8(_) => LogicalType::UInt8,
            NativeValue::UInt16(_) => LogicalType::UInt16,
            NativeValue::UInt32(_) => LogicalType::UInt32,
            NativeValue::UInt64(_) => LogicalType::UInt64,
            NativeValue::Float(_) => LogicalType::Float,
            NativeValue::Double(_) => LogicalType::Double,
            NativeValue::String(_) => LogicalType::String,
            NativeValue::Blob(_) => LogicalType::Blob,
            NativeValue::Uuid(_) => LogicalType::Uuid,
            NativeValue::Decimal(_) => LogicalType::Decimal,
            NativeValue::Date(_) => LogicalType::Date,
            NativeValue::Timestamp(_) => LogicalType::Timestamp,
            NativeValue::Interval(_) => LogicalType::Interval,
            NativeValue::List(t, _) => LogicalType::List(Box::new(t.clone())),
            NativeValue::Array(t, items) => LogicalType::Array(Box::new(t.clone()), items.len()),
            NativeValue::Struct(fields) => LogicalType::Struct(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.logical_type()))
                    .collect(),
            ),
            NativeValue::Map(k, v, _) => LogicalType::Map(Box::new(k.clone()), Box::new(v.clone())),
            NativeValue::Union(..) => LogicalType::Union,
            NativeValue::Node(_) => LogicalType::Node,
            NativeValue::Rel(_) => LogicalType::Rel,
            NativeValue::RecursiveRel { .. } => LogicalType::RecursiveRel,
            NativeValue::InternalId { .. } => LogicalType::InternalId,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of any fixed-width integer that fits in `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NativeValue::Int8(v) => Some(*v as i64),
            NativeValue::Int16(v) => Some(*v as i64),
            NativeValue::Int32(v) => Some(*v as i64),
            NativeValue::Int64(v) => Some(*v),
            NativeValue::Int128(v) => i64::try_from(*v).ok(),
            NativeValue::UInt8(v) => Some(*v as i64),
            NativeValue::UInt16(v) => Some(*v as i64),
            NativeValue::UInt32(v) => Some(*v as i64),
            NativeValue::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Floating point view of any numeric value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NativeValue::Float(v) => Some(*v as f64),
            NativeValue::Double(v) => Some(*v),
            NativeValue::Int128(v) => Some(*v as f64),
            NativeValue::UInt64(v) => Some(*v as f64),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            NativeValue::Int8(_)
                | NativeValue::Int16(_)
                | NativeValue::Int32(_)
                | NativeValue::Int64(_)
                | NativeValue::Int128(_)
                | NativeValue::UInt8(_)
                | NativeValue::UInt16(_)
                | NativeValue::UInt32(_)
                | NativeValue::UInt64(_)
                | NativeValue::Float(_)
                | NativeValue::Double(_)
        )
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null(_) => write!(f, ""),
            NativeValue::Bool(b) => write!(f, "{}", b),
            NativeValue::Int8(v) => write!(f, "{}", v),
            NativeValue::Int16(v) => write!(f, "{}", v),
            NativeValue::Int32(v) => write!(f, "{}", v),
            NativeValue::Int64(v) => write!(f, "{}", v),
            NativeValue::Int128(v) => write!(f, "{}", v),
            NativeValue::UInt8(v) => write!(f, "{}", v),
            NativeValue::UInt16(v) => write!(f, "{}", v),
            NativeValue::UInt32(v) => write!(f, "{}", v),
            NativeValue::UInt64(v) => write!(f, "{}", v),
            NativeValue::Float(v) => write!(f, "{}", v),
            NativeValue::Double(v) => write!(f, "{}", v),
            NativeValue::String(s) => write!(f, "{}", s),
            NativeValue::Blob(bytes) => {
                for b in bytes {
                    write!(f, "\\x{:02X}", b)?;
                }
                Ok(())
            }
            NativeValue::Uuid(u) => write!(f, "{}", u),
            NativeValue::Decimal(d) => write!(f, "{}", d),
            NativeValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            NativeValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            NativeValue::Interval(i) => write!(f, "{}", i),
            NativeValue::List(_, items) | NativeValue::Array(_, items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            NativeValue::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            NativeValue::Map(_, _, entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            NativeValue::Union(tag, v) => write!(f, "{}:{}", tag, v),
            NativeValue::Node(n) => write!(f, "({}:{})", n.id, n.label),
            NativeValue::Rel(r) => write!(f, "({})-[{}:{}]->({})", r.src, r.id, r.label, r.dst),
            NativeValue::RecursiveRel { nodes, rels } => {
                write!(f, "path({} nodes, {} rels)", nodes.len(), rels.len())
            }
            NativeValue::InternalId { table, offset } => write!(f, "{}:{}", table, offset),
        }
    }
}

impl From<&str> for NativeValue {
    fn from(s: &str) -> Self {
        NativeValue::String(s.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(s: String) -> Self {
        NativeValue::String(s)
    }
}

impl From<i64> for NativeValue {
    fn from(i: i64) -> Self {
        NativeValue::Int64(i)
    }
}

impl From<f64> for NativeValue {
    fn from(f: f64) -> Self {
        NativeValue::Double(f)
    }
}

impl From<bool> for NativeValue {
    fn from(b: bool) -> Self {
        NativeValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_names() {
        assert_eq!(LogicalType::parse("int64"), Some(LogicalType::Int64));
        assert_eq!(LogicalType::parse("BOOLEAN"), Some(LogicalType::Bool));
        assert_eq!(
            LogicalType::parse("STRING[]"),
            Some(LogicalType::List(Box::new(LogicalType::String)))
        );
        assert_eq!(LogicalType::parse("GEOMETRY"), None);
    }

    #[test]
    fn test_type_names_round_trip_through_display() {
        for name in ["INT64", "STRING", "BOOL", "DATE", "TIMESTAMP", "INTERVAL", "DOUBLE", "INT64[]"] {
            let ty = LogicalType::parse(name).unwrap();
            assert_eq!(ty.to_string(), name);
        }
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(NativeValue::Int16(-4).as_i64(), Some(-4));
        assert_eq!(NativeValue::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(NativeValue::Float(1.5).as_f64(), Some(1.5));
        assert!(NativeValue::Double(0.0).is_numeric());
        assert!(!NativeValue::String("1".into()).is_numeric());
    }

    #[test]
    fn test_null_keeps_its_type() {
        let v = NativeValue::Null(LogicalType::Int64);
        assert!(v.is_null());
        assert_eq!(v.logical_type(), LogicalType::Int64);
    }
}
