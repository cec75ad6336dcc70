//! NoteGraph
//!
//! A schema-aware, in-memory cache of a property graph kept in sync with an
//! embedded Cypher engine, plus a force-directed layout for displaying it.
//!
//! # Architecture
//!
//! - `value`: generic property values and their conversion to and from the
//!   engine's native values
//! - `schema`: node and edge type definitions and their evolution
//! - `query`: translation of store operations into engine statements
//! - `engine`: the embedded engine (catalog, Cypher subset, file snapshots)
//! - `store`: the reactive store of note graphs; every mutation is followed
//!   by a full reload that is published to subscribers
//! - `layout`: the visual state and the force-directed layout runs
//!
//! ## Example Usage
//!
//! ```rust
//! use notegraph::{GraphNode, NodeSchema, PropertyDefinition, PropertyGraphStore, PropertyInstance, PropertyType, StoreConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = PropertyGraphStore::embedded(StoreConfig::default());
//! store.create_note_graph(":memory:").await.unwrap();
//!
//! let person = NodeSchema::new("Person", vec![PropertyDefinition::new("name", PropertyType::Text)]);
//! assert!(store.add_node_schema(person).await);
//!
//! let alice = GraphNode::new("Person", vec![PropertyInstance::new("name", "Alice")]);
//! assert!(store.add_node(alice).await);
//!
//! let graph = store.selected_note_graph().unwrap();
//! assert_eq!(graph.nodes.len(), 1);
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod layout;
pub mod query;
pub mod schema;
pub mod store;
pub mod value;

// Re-export main types for convenience
pub use config::{ConfigError, NoteGraphConfig, StoreConfig};

pub use engine::{
    Connector, EmbeddedConnector, EmbeddedDatabase, EngineError, EngineResult, GraphDatabase,
    NativeResult, IN_MEMORY,
};

pub use error::{FailureKind, NoteGraphError, NoteGraphResult};

pub use graph::{GraphEdge, GraphElement, GraphNode, NoteGraph, PropertyInstance};

pub use layout::{GraphVisualState, LayoutConfig, LayoutManager, Point};

pub use query::{ParameterMode, QueryResult, QueryTranslator, Statement};

pub use schema::{
    EdgeSchema, ElementKind, NodeSchema, PropertyDefinition, PropertyType, SchemaError,
    SchemaRegistry,
};

pub use store::{PropertyGraphStore, StoreFailure};

pub use value::{CodecError, LogicalType, NativeValue, Value};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }
}
