//! Graph data model: element instances and the NoteGraph aggregate

pub mod element;
pub mod note_graph;

pub use element::{GraphEdge, GraphElement, GraphNode, PropertyInstance};
pub use note_graph::NoteGraph;
