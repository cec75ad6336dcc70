//! Schema registry
//!
//! Node and edge type definitions of the active graph, the identifier rules
//! they must follow, and the diff that drives schema evolution.

pub mod definition;
pub mod property;
pub mod registry;

pub use definition::{EdgeSchema, ElementKind, NodeSchema, SchemaDefinition};
pub use property::{PropertyDefinition, PropertyType};
pub use registry::{diff_properties, rebuild_properties, SchemaChange, SchemaRegistry};

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Keys every element carries as metadata; they cannot be declared
pub const RESERVED_KEYS: [&str; 4] = ["id", "label", "src", "dst"];

static NODE_TYPE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid regex"));
static EDGE_TYPE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("valid regex"));
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Schema errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Invalid {kind} type name: '{name}'")]
    InvalidTypeName { kind: ElementKind, name: String },

    #[error("Invalid property key: '{0}'")]
    InvalidPropertyKey(String),

    #[error("Property key '{0}' is reserved")]
    ReservedPropertyKey(String),

    #[error("Type name '{0}' already exists")]
    DuplicateTypeName(String),

    #[error("Duplicate property key '{key}' in schema '{schema}'")]
    DuplicatePropertyKey { schema: String, key: String },

    #[error("Schema not found: {0}")]
    UnknownSchema(String),

    #[error("Edge endpoint type '{0}' is not a node schema")]
    UnknownEndpointType(String),

    #[error("Unknown property type: '{0}'")]
    UnknownPropertyType(String),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Normalise a user-entered property key: trim, then spaces become `_`
pub fn normalize_property_key(raw: &str) -> String {
    raw.trim().replace(' ', "_")
}

pub fn validate_node_type_name(name: &str) -> SchemaResult<()> {
    if NODE_TYPE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidTypeName {
            kind: ElementKind::Node,
            name: name.to_string(),
        })
    }
}

pub fn validate_edge_type_name(name: &str) -> SchemaResult<()> {
    if EDGE_TYPE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidTypeName {
            kind: ElementKind::Edge,
            name: name.to_string(),
        })
    }
}

/// Check an already normalised property key
pub fn validate_property_key(key: &str) -> SchemaResult<()> {
    if !IDENTIFIER.is_match(key) {
        return Err(SchemaError::InvalidPropertyKey(key.to_string()));
    }
    if RESERVED_KEYS.iter().any(|r| r.eq_ignore_ascii_case(key)) {
        return Err(SchemaError::ReservedPropertyKey(key.to_string()));
    }
    Ok(())
}

/// Whether a name may be interpolated into query text as a table or column
pub fn is_safe_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_rules() {
        assert!(validate_node_type_name("Person").is_ok());
        assert!(validate_node_type_name("note_2").is_ok());
        assert!(validate_node_type_name("2note").is_err());
        assert!(validate_node_type_name("Per son").is_err());

        assert!(validate_edge_type_name("KNOWS").is_ok());
        assert!(validate_edge_type_name("WORKS_AT").is_ok());
        assert!(validate_edge_type_name("knows").is_err());
        assert!(validate_edge_type_name("_KNOWS").is_err());
    }

    #[test]
    fn test_property_key_rules() {
        assert_eq!(normalize_property_key("  first name "), "first_name");
        assert!(validate_property_key("first_name").is_ok());
        assert!(validate_property_key("_hidden").is_ok());
        assert!(validate_property_key("1st").is_err());
        assert!(validate_property_key("a-b").is_err());
        assert_eq!(
            validate_property_key("ID"),
            Err(SchemaError::ReservedPropertyKey("ID".to_string()))
        );
    }

    #[test]
    fn test_injection_is_not_an_identifier() {
        assert!(!is_safe_identifier("Person) DETACH DELETE n //"));
        assert!(is_safe_identifier("Person"));
    }
}
