//! The NoteGraph aggregate

use super::element::{GraphEdge, GraphNode};
use crate::schema::{EdgeSchema, NodeSchema};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One graph, backed by one engine database inside `file_path`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteGraph {
    pub id: Uuid,
    pub file_path: PathBuf,
    pub node_schemas: Vec<NodeSchema>,
    pub edge_schemas: Vec<EdgeSchema>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl NoteGraph {
    /// Empty graph for a directory; contents are filled in by a reload
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_path: file_path.into(),
            node_schemas: Vec::new(),
            edge_schemas: Vec::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Display name: the last segment of the directory path
    pub fn name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_path.to_string_lossy().into_owned())
    }

    /// Location of the database file inside the graph directory
    pub fn database_path(&self, file_name: &str) -> PathBuf {
        if is_volatile(&self.file_path) {
            self.file_path.clone()
        } else {
            self.file_path.join(file_name)
        }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn node_schema(&self, type_name: &str) -> Option<&NodeSchema> {
        self.node_schemas.iter().find(|s| s.type_name == type_name)
    }

    pub fn edge_schema(&self, type_name: &str) -> Option<&EdgeSchema> {
        self.edge_schemas.iter().find(|s| s.type_name == type_name)
    }

    pub fn nodes_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a GraphNode> + 'a {
        self.nodes.iter().filter(move |n| n.type_name == type_name)
    }

    pub fn edges_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.type_name == type_name)
    }

    /// Whether this graph lives in memory only
    pub fn is_volatile(&self) -> bool {
        is_volatile(&self.file_path)
    }
}

pub(crate) fn is_volatile(path: &Path) -> bool {
    path.as_os_str() == crate::engine::IN_MEMORY
}
