//! Node and edge schema definitions

use super::property::PropertyDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of element a schema (or element) describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Node,
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Node => write!(f, "node"),
            ElementKind::Edge => write!(f, "edge"),
        }
    }
}

/// Type definition for nodes. Every node table also carries the reserved
/// `id` primary key, which is not listed in `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSchema {
    pub id: i64,
    pub type_name: String,
    pub properties: Vec<PropertyDefinition>,
    #[serde(default)]
    pub allow_semi_structured: bool,
}

impl NodeSchema {
    /// New schema; the id is assigned when it is added to a graph
    pub fn new(type_name: impl Into<String>, properties: Vec<PropertyDefinition>) -> Self {
        Self {
            id: 0,
            type_name: type_name.into(),
            properties,
            allow_semi_structured: false,
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.key == key)
    }
}

/// Type definition for edges between two node types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSchema {
    pub id: i64,
    pub type_name: String,
    pub from_type: String,
    pub to_type: String,
    pub properties: Vec<PropertyDefinition>,
    #[serde(default)]
    pub allow_semi_structured: bool,
}

impl EdgeSchema {
    pub fn new(
        type_name: impl Into<String>,
        from_type: impl Into<String>,
        to_type: impl Into<String>,
        properties: Vec<PropertyDefinition>,
    ) -> Self {
        Self {
            id: 0,
            type_name: type_name.into(),
            from_type: from_type.into(),
            to_type: to_type.into(),
            properties,
            allow_semi_structured: false,
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.key == key)
    }
}

/// Either kind of schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SchemaDefinition {
    Node(NodeSchema),
    Edge(EdgeSchema),
}

impl SchemaDefinition {
    pub fn id(&self) -> i64 {
        match self {
            SchemaDefinition::Node(s) => s.id,
            SchemaDefinition::Edge(s) => s.id,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            SchemaDefinition::Node(s) => &s.type_name,
            SchemaDefinition::Edge(s) => &s.type_name,
        }
    }

    pub fn properties(&self) -> &[PropertyDefinition] {
        match self {
            SchemaDefinition::Node(s) => &s.properties,
            SchemaDefinition::Edge(s) => &s.properties,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            SchemaDefinition::Node(_) => ElementKind::Node,
            SchemaDefinition::Edge(_) => ElementKind::Edge,
        }
    }
}

impl From<NodeSchema> for SchemaDefinition {
    fn from(s: NodeSchema) -> Self {
        SchemaDefinition::Node(s)
    }
}

impl From<EdgeSchema> for SchemaDefinition {
    fn from(s: EdgeSchema) -> Self {
        SchemaDefinition::Edge(s)
    }
}
