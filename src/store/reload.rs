//! Full resynchronisation of a graph snapshot from the engine

use crate::engine::{GraphDatabase, NativeResult};
use crate::error::{NoteGraphError, NoteGraphResult};
use crate::graph::{GraphEdge, GraphNode, PropertyInstance};
use crate::query::{QueryTranslator, Statement, ID_COLUMN};
use crate::schema::{EdgeSchema, NodeSchema, PropertyDefinition, PropertyType};
use crate::value::{coerce, decode, CodecError, LogicalType, NativeValue, NodeVal, RelVal, Value};
use tracing::debug;

/// Instances read back from the engine, with the values that failed to decode
#[derive(Debug, Default)]
pub(crate) struct LoadedInstances {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub errors: Vec<CodecError>,
}

async fn run(db: &dyn GraphDatabase, translator: &QueryTranslator, statement: Statement) -> NoteGraphResult<NativeResult> {
    let statement = statement.prepare(translator.mode());
    Ok(db.execute(&statement).await?)
}

fn text(value: Option<&NativeValue>) -> NoteGraphResult<String> {
    value
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| NoteGraphError::Read(format!("Unexpected introspection value {:?}", value)))
}

/// Read every table definition and rebuild the node and edge schemas.
///
/// Column types map back through [`PropertyType::from_native`]; the reserved
/// identity column is not a property.
pub(crate) async fn load_schemas(
    db: &dyn GraphDatabase,
    translator: &QueryTranslator,
) -> NoteGraphResult<(Vec<NodeSchema>, Vec<EdgeSchema>)> {
    let tables = run(db, translator, translator.show_tables()).await?;
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for row in &tables.rows {
        let name = text(row.first())?;
        let kind = text(row.get(1))?;
        let properties = load_properties(db, translator, &name).await?;

        match kind.as_str() {
            "NODE" => nodes.push(NodeSchema::new(name, properties)),
            "REL" => {
                let connection = run(db, translator, translator.show_connection(&name)?).await?;
                let endpoints = connection
                    .rows
                    .first()
                    .ok_or_else(|| NoteGraphError::Read(format!("No connection for {}", name)))?;
                let from = text(endpoints.first())?;
                let to = text(endpoints.get(1))?;
                edges.push(EdgeSchema::new(name, from, to, properties));
            }
            other => debug!("Skipping table {} of kind {}", name, other),
        }
    }
    Ok((nodes, edges))
}

async fn load_properties(
    db: &dyn GraphDatabase,
    translator: &QueryTranslator,
    table: &str,
) -> NoteGraphResult<Vec<PropertyDefinition>> {
    let info = run(db, translator, translator.table_info(table)?).await?;
    let mut properties = Vec::with_capacity(info.rows.len());
    for row in &info.rows {
        let key = text(row.first())?;
        if key == ID_COLUMN {
            continue;
        }
        let native = LogicalType::parse(&text(row.get(1))?).unwrap_or(LogicalType::Any);
        properties.push(PropertyDefinition::new(key, PropertyType::from_native(&native)));
    }
    Ok(properties)
}

/// Read all nodes and edges of the graph
pub(crate) async fn load_instances(
    db: &dyn GraphDatabase,
    translator: &QueryTranslator,
    node_schemas: &[NodeSchema],
    edge_schemas: &[EdgeSchema],
) -> NoteGraphResult<LoadedInstances> {
    let mut loaded = LoadedInstances::default();

    let nodes = run(db, translator, translator.fetch_all_nodes()).await?;
    loaded.nodes = nodes_from_result(&nodes, node_schemas, &mut loaded.errors);

    let edges = run(db, translator, translator.fetch_all_edges()).await?;
    loaded.edges = edges_from_result(&edges, edge_schemas, &mut loaded.errors);

    Ok(loaded)
}

pub(crate) fn nodes_from_result(
    result: &NativeResult,
    schemas: &[NodeSchema],
    errors: &mut Vec<CodecError>,
) -> Vec<GraphNode> {
    result
        .rows
        .iter()
        .filter_map(|row| match row.first() {
            Some(NativeValue::Node(node)) => {
                let schema = schemas.iter().find(|s| s.type_name == node.label);
                Some(node_from_native(node, schema, errors))
            }
            _ => None,
        })
        .collect()
}

pub(crate) fn edges_from_result(
    result: &NativeResult,
    schemas: &[EdgeSchema],
    errors: &mut Vec<CodecError>,
) -> Vec<GraphEdge> {
    result
        .rows
        .iter()
        .filter_map(|row| match row.first() {
            Some(NativeValue::Rel(rel)) => {
                let schema = schemas.iter().find(|s| s.type_name == rel.label);
                Some(edge_from_native(rel, schema, errors))
            }
            _ => None,
        })
        .collect()
}

fn node_from_native(node: &NodeVal, schema: Option<&NodeSchema>, errors: &mut Vec<CodecError>) -> GraphNode {
    let properties = properties_from_native(&node.properties, schema.map(|s| s.properties.as_slice()), errors);
    GraphNode::with_id(node.id.clone(), node.label.clone(), properties)
}

fn edge_from_native(rel: &RelVal, schema: Option<&EdgeSchema>, errors: &mut Vec<CodecError>) -> GraphEdge {
    GraphEdge {
        id: rel.id.clone(),
        type_name: rel.label.clone(),
        source_node_id: rel.src.clone(),
        target_node_id: rel.dst.clone(),
        properties: properties_from_native(&rel.properties, schema.map(|s| s.properties.as_slice()), errors),
    }
}

/// Decode the columns of one element, keeping only declared keys.
///
/// A value that cannot be decoded is kept as [`Value::Unsupported`].
fn properties_from_native(
    columns: &[(String, NativeValue)],
    definitions: Option<&[PropertyDefinition]>,
    errors: &mut Vec<CodecError>,
) -> Vec<PropertyInstance> {
    columns
        .iter()
        .filter(|(key, _)| key != ID_COLUMN)
        .filter_map(|(key, native)| {
            let ty = match definitions {
                Some(defs) => Some(defs.iter().find(|d| d.key == *key)?.ty),
                None => None,
            };
            let value = match decode(native) {
                Ok(value) => match ty {
                    Some(ty) => coerce(value, ty),
                    None => value,
                },
                Err(e) => {
                    errors.push(e);
                    Value::Unsupported {
                        type_name: native.logical_type().to_string(),
                    }
                }
            };
            Some(PropertyInstance::new(key.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> NodeSchema {
        NodeSchema::new(
            "Person",
            vec![
                PropertyDefinition::new("name", PropertyType::Text),
                PropertyDefinition::new("tags", PropertyType::List),
            ],
        )
    }

    #[test]
    fn test_node_keeps_declared_keys_only() {
        let node = NodeVal {
            id: "a".to_string(),
            label: "Person".to_string(),
            properties: vec![
                ("id".to_string(), NativeValue::String("a".into())),
                ("name".to_string(), NativeValue::String("Alice".into())),
                ("stale".to_string(), NativeValue::Int64(1)),
                ("tags".to_string(), NativeValue::String("[\"x\"]".into())),
            ],
        };
        let mut errors = Vec::new();
        let graph_node = node_from_native(&node, Some(&person()), &mut errors);

        assert!(errors.is_empty());
        assert_eq!(graph_node.id, "a");
        let keys: Vec<&str> = graph_node.properties.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "tags"]);
        assert_eq!(
            graph_node.property("tags"),
            Some(&Value::List(vec![Value::String("x".into())]))
        );
    }

    #[test]
    fn test_undecodable_value_is_marked() {
        let rel = RelVal {
            id: "e".to_string(),
            label: "KNOWS".to_string(),
            src: "a".to_string(),
            dst: "b".to_string(),
            properties: vec![(
                "odd".to_string(),
                NativeValue::Union("tag".into(), Box::new(NativeValue::Bool(true))),
            )],
        };
        let mut errors = Vec::new();
        let edge = edge_from_native(&rel, None, &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!((edge.source_node_id.as_str(), edge.target_node_id.as_str()), ("a", "b"));
        assert!(matches!(edge.property("odd"), Some(Value::Unsupported { .. })));
    }
}
