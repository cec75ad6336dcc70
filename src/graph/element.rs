//! Graph element instances

use crate::schema::ElementKind;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A property value on a node or edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInstance {
    pub key: String,
    pub value: Value,
}

impl PropertyInstance {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Node instance of a node schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub type_name: String,
    pub properties: Vec<PropertyInstance>,
}

impl GraphNode {
    /// New node with a random id
    pub fn new(type_name: impl Into<String>, properties: Vec<PropertyInstance>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), type_name, properties)
    }

    pub fn with_id(id: impl Into<String>, type_name: impl Into<String>, properties: Vec<PropertyInstance>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            properties,
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        property(&self.properties, key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        set_property(&mut self.properties, key.into(), value.into())
    }
}

/// Edge instance of an edge schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub type_name: String,
    pub source_node_id: String,
    pub target_node_id: String,
    pub properties: Vec<PropertyInstance>,
}

impl GraphEdge {
    /// New edge with a random id
    pub fn new(
        type_name: impl Into<String>,
        source_node_id: impl Into<String>,
        target_node_id: impl Into<String>,
        properties: Vec<PropertyInstance>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            type_name: type_name.into(),
            source_node_id: source_node_id.into(),
            target_node_id: target_node_id.into(),
            properties,
        }
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        property(&self.properties, key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        set_property(&mut self.properties, key.into(), value.into())
    }
}

/// A node or an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GraphElement {
    Node(GraphNode),
    Edge(GraphEdge),
}

impl GraphElement {
    pub fn id(&self) -> &str {
        match self {
            GraphElement::Node(n) => &n.id,
            GraphElement::Edge(e) => &e.id,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            GraphElement::Node(n) => &n.type_name,
            GraphElement::Edge(e) => &e.type_name,
        }
    }

    pub fn properties(&self) -> &[PropertyInstance] {
        match self {
            GraphElement::Node(n) => &n.properties,
            GraphElement::Edge(e) => &e.properties,
        }
    }

    pub fn properties_mut(&mut self) -> &mut Vec<PropertyInstance> {
        match self {
            GraphElement::Node(n) => &mut n.properties,
            GraphElement::Edge(e) => &mut e.properties,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            GraphElement::Node(_) => ElementKind::Node,
            GraphElement::Edge(_) => ElementKind::Edge,
        }
    }
}

impl From<GraphNode> for GraphElement {
    fn from(n: GraphNode) -> Self {
        GraphElement::Node(n)
    }
}

impl From<GraphEdge> for GraphElement {
    fn from(e: GraphEdge) -> Self {
        GraphElement::Edge(e)
    }
}

fn property<'a>(properties: &'a [PropertyInstance], key: &str) -> Option<&'a Value> {
    properties.iter().find(|p| p.key == key).map(|p| &p.value)
}

fn set_property(properties: &mut Vec<PropertyInstance>, key: String, value: Value) {
    match properties.iter_mut().find(|p| p.key == key) {
        Some(p) => p.value = value,
        None => properties.push(PropertyInstance { key, value }),
    }
}
