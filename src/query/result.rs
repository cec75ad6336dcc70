//! Generic query results

use crate::engine::NativeResult;
use crate::value::{decode, CodecError, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Rows of generic values keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    /// Native type name per column
    pub column_types: IndexMap<String, String>,
    pub rows: Vec<IndexMap<String, Value>>,
}

impl QueryResult {
    /// Decode a native result. A value that cannot be decoded becomes
    /// [`Value::Unsupported`] and its error is returned alongside, so one
    /// exotic column does not lose the whole result.
    pub fn from_native(native: NativeResult) -> (QueryResult, Vec<CodecError>) {
        let mut errors = Vec::new();
        let column_types = native
            .columns
            .iter()
            .zip(&native.column_types)
            .map(|(c, t)| (c.clone(), t.to_string()))
            .collect();

        let rows = native
            .rows
            .iter()
            .map(|row| {
                native
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| {
                        let decoded = decode(value).unwrap_or_else(|e| {
                            errors.push(e);
                            Value::Unsupported {
                                type_name: value.logical_type().to_string(),
                            }
                        });
                        (column.clone(), decoded)
                    })
                    .collect()
            })
            .collect();

        (
            QueryResult {
                columns: native.columns,
                column_types,
                rows,
            },
            errors,
        )
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `row`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row)?.get(column)
    }

    /// All values of one column
    pub fn column(&self, column: &str) -> Vec<&Value> {
        self.rows.iter().filter_map(|r| r.get(column)).collect()
    }

    /// `[{column: value, ...}, ...]`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.rows
                .iter()
                .map(|row| {
                    serde_json::Value::Object(row.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{LogicalType, NativeValue};

    #[test]
    fn test_from_native() {
        let native = NativeResult::from_rows(
            vec!["name".to_string(), "age".to_string()],
            vec![vec![NativeValue::String("Alice".into()), NativeValue::Int64(30)]],
        );
        let (result, errors) = QueryResult::from_native(native);
        assert!(errors.is_empty());
        assert_eq!(result.len(), 1);
        assert_eq!(result.get(0, "name"), Some(&Value::String("Alice".into())));
        assert_eq!(result.get(0, "age"), Some(&Value::Integer(30)));
        assert_eq!(result.column_types["age"], "INT64");
    }

    #[test]
    fn test_unsupported_value_keeps_row() {
        let native = NativeResult::from_rows(
            vec!["u".to_string(), "x".to_string()],
            vec![vec![
                NativeValue::Union("tag".into(), Box::new(NativeValue::Int64(1))),
                NativeValue::Bool(true),
            ]],
        );
        let (result, errors) = QueryResult::from_native(native);
        assert_eq!(errors.len(), 1);
        assert!(matches!(result.get(0, "u"), Some(Value::Unsupported { .. })));
        assert_eq!(result.get(0, "x"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_to_json() {
        let native = NativeResult::from_rows(
            vec!["n".to_string()],
            vec![vec![NativeValue::Null(LogicalType::Int64)]],
        );
        let (result, _) = QueryResult::from_native(native);
        assert_eq!(result.to_json(), serde_json::json!([{ "n": null }]));
    }
}
