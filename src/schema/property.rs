//! Property types and property definitions

use super::SchemaError;
use crate::value::{Interval, LogicalType, Value};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Semantic kind of a schema property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Text,
    LongText,
    Image,
    Number,
    Boolean,
    Date,
    Timestamp,
    Interval,
    List,
    Map,
    Vector,
    Struct,
}

impl PropertyType {
    pub const ALL: [PropertyType; 12] = [
        PropertyType::Text,
        PropertyType::LongText,
        PropertyType::Image,
        PropertyType::Number,
        PropertyType::Boolean,
        PropertyType::Date,
        PropertyType::Timestamp,
        PropertyType::Interval,
        PropertyType::List,
        PropertyType::Map,
        PropertyType::Vector,
        PropertyType::Struct,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::Text => "TEXT",
            PropertyType::LongText => "LONG_TEXT",
            PropertyType::Image => "IMAGE",
            PropertyType::Number => "NUMBER",
            PropertyType::Boolean => "BOOLEAN",
            PropertyType::Date => "DATE",
            PropertyType::Timestamp => "TIMESTAMP",
            PropertyType::Interval => "INTERVAL",
            PropertyType::List => "LIST",
            PropertyType::Map => "MAP",
            PropertyType::Vector => "VECTOR",
            PropertyType::Struct => "STRUCT",
        }
    }

    /// Column type used to store this property.
    ///
    /// Composite types have no direct column type and are stored as JSON text.
    pub fn native_type(&self) -> LogicalType {
        match self {
            PropertyType::Text | PropertyType::LongText | PropertyType::Image => LogicalType::String,
            PropertyType::Number => LogicalType::Int64,
            PropertyType::Boolean => LogicalType::Bool,
            PropertyType::Date => LogicalType::Date,
            PropertyType::Timestamp => LogicalType::Timestamp,
            PropertyType::Interval => LogicalType::Interval,
            PropertyType::List | PropertyType::Map | PropertyType::Vector | PropertyType::Struct => {
                LogicalType::String
            }
        }
    }

    /// Property type recovered from a column type. Unknown types map to TEXT.
    pub fn from_native(ty: &LogicalType) -> PropertyType {
        match ty {
            LogicalType::Int8
            | LogicalType::Int16
            | LogicalType::Int32
            | LogicalType::Int64
            | LogicalType::UInt8
            | LogicalType::UInt16
            | LogicalType::UInt32
            | LogicalType::UInt64
            | LogicalType::Int128 => PropertyType::Number,
            LogicalType::Bool => PropertyType::Boolean,
            LogicalType::Date => PropertyType::Date,
            LogicalType::Timestamp => PropertyType::Timestamp,
            LogicalType::Interval => PropertyType::Interval,
            _ => PropertyType::Text,
        }
    }

    /// Value seeded into instances that lack this property
    pub fn default_value(&self) -> Value {
        match self {
            PropertyType::Text | PropertyType::LongText | PropertyType::Image => Value::String(String::new()),
            PropertyType::Number => Value::Integer(0),
            PropertyType::Boolean => Value::Bool(false),
            PropertyType::Date => Value::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()),
            PropertyType::Timestamp => Value::Timestamp(NaiveDate::default().and_time(NaiveTime::MIN)),
            PropertyType::Interval => Value::Interval(Interval::default()),
            PropertyType::List => Value::List(Vec::new()),
            PropertyType::Map => Value::Map(Default::default()),
            PropertyType::Struct => Value::Struct(Default::default()),
            PropertyType::Vector => Value::List(vec![Value::Float(0.0); 3]),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            PropertyType::List | PropertyType::Map | PropertyType::Vector | PropertyType::Struct
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PropertyType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace(' ', "_");
        PropertyType::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| SchemaError::UnknownPropertyType(s.to_string()))
    }
}

/// One property of a node or edge schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub id: Uuid,
    pub key: String,
    #[serde(rename = "type")]
    pub ty: PropertyType,
    #[serde(default)]
    pub is_indexed: bool,
    #[serde(default)]
    pub is_full_text_indexed: bool,
}

impl PropertyDefinition {
    pub fn new(key: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            ty,
            is_indexed: false,
            is_full_text_indexed: false,
        }
    }

    pub fn indexed(mut self) -> Self {
        self.is_indexed = true;
        self
    }

    pub fn full_text_indexed(mut self) -> Self {
        self.is_full_text_indexed = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_mapping() {
        assert_eq!(PropertyType::Text.native_type(), LogicalType::String);
        assert_eq!(PropertyType::Image.native_type(), LogicalType::String);
        assert_eq!(PropertyType::Number.native_type(), LogicalType::Int64);
        assert_eq!(PropertyType::Vector.native_type(), LogicalType::String);
        assert_eq!(PropertyType::Interval.native_type(), LogicalType::Interval);
    }

    #[test]
    fn test_reverse_mapping_defaults_to_text() {
        assert_eq!(PropertyType::from_native(&LogicalType::Int64), PropertyType::Number);
        assert_eq!(PropertyType::from_native(&LogicalType::Bool), PropertyType::Boolean);
        assert_eq!(PropertyType::from_native(&LogicalType::Blob), PropertyType::Text);
        assert_eq!(PropertyType::from_native(&LogicalType::Double), PropertyType::Text);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PropertyType::Text.default_value(), Value::from(""));
        assert_eq!(PropertyType::Number.default_value(), Value::Integer(0));
        assert_eq!(PropertyType::Boolean.default_value(), Value::Bool(false));
        assert_eq!(
            PropertyType::Vector.default_value(),
            Value::List(vec![Value::Float(0.0), Value::Float(0.0), Value::Float(0.0)])
        );
        assert_eq!(
            PropertyType::Timestamp.default_value(),
            PropertyType::Timestamp.default_value()
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("long_text".parse::<PropertyType>().unwrap(), PropertyType::LongText);
        assert_eq!("Long Text".parse::<PropertyType>().unwrap(), PropertyType::LongText);
        assert!("GEOMETRY".parse::<PropertyType>().is_err());
        for ty in PropertyType::ALL {
            assert_eq!(ty.to_string().parse::<PropertyType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_defaults_encode_as_their_type() {
        for ty in PropertyType::ALL {
            assert!(crate::value::encode(&ty.default_value(), ty).is_ok(), "{}", ty);
        }
    }
}
