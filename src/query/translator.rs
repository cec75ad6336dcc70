//! Typed CRUD operations rendered as engine statements
//!
//! Schema identifiers (table and column names) cannot be bound as parameters
//! and are interpolated into the text after passing
//! [`is_safe_identifier`]. Property values are always `$` parameters; the
//! configured [`ParameterMode`] decides whether they are bound or inlined.

use super::statement::{ParameterMode, Statement};
use crate::graph::{GraphEdge, GraphNode, PropertyInstance};
use crate::schema::{is_safe_identifier, EdgeSchema, NodeSchema, PropertyDefinition, SchemaChange};
use crate::value::{encode, quote, CodecError, NativeValue, Value};
use thiserror::Error;

/// Name of the reserved identity column of every table
pub const ID_COLUMN: &str = "id";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslateError {
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Property {key} is not declared by {type_name}")]
    UnknownProperty { type_name: String, key: String },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type TranslateResult<T> = Result<T, TranslateError>;

fn ident(name: &str) -> TranslateResult<&str> {
    if is_safe_identifier(name) {
        Ok(name)
    } else {
        Err(TranslateError::InvalidIdentifier(name.to_string()))
    }
}

/// Builds statements for the store
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryTranslator {
    mode: ParameterMode,
}

impl QueryTranslator {
    pub fn new(mode: ParameterMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ParameterMode {
        self.mode
    }

    fn finish(&self, statement: Statement) -> Statement {
        statement.prepare(self.mode)
    }

    /// Pass-through for arbitrary query text
    pub fn raw(&self, text: &str) -> Statement {
        Statement::new(text)
    }

    // ---- DDL ----

    pub fn create_node_table(&self, schema: &NodeSchema) -> TranslateResult<Statement> {
        let mut columns = vec![format!("{} STRING", ID_COLUMN)];
        columns.extend(column_defs(&schema.properties)?);
        Ok(Statement::new(format!(
            "CREATE NODE TABLE {} ({}, PRIMARY KEY ({}))",
            ident(&schema.type_name)?,
            columns.join(", "),
            ID_COLUMN
        )))
    }

    pub fn create_rel_table(&self, schema: &EdgeSchema) -> TranslateResult<Statement> {
        let mut columns = vec![format!("{} STRING", ID_COLUMN)];
        columns.extend(column_defs(&schema.properties)?);
        Ok(Statement::new(format!(
            "CREATE REL TABLE {} (FROM {} TO {}, {})",
            ident(&schema.type_name)?,
            ident(&schema.from_type)?,
            ident(&schema.to_type)?,
            columns.join(", ")
        )))
    }

    pub fn drop_table(&self, table: &str) -> TranslateResult<Statement> {
        Ok(Statement::new(format!("DROP TABLE {}", ident(table)?)))
    }

    pub fn alter_table(&self, table: &str, change: &SchemaChange) -> TranslateResult<Statement> {
        let text = match change {
            SchemaChange::RenameTable { from, to } => {
                format!("ALTER TABLE {} RENAME TO {}", ident(from)?, ident(to)?)
            }
            SchemaChange::DropProperty(key) => format!("ALTER TABLE {} DROP {}", ident(table)?, ident(key)?),
            SchemaChange::AddProperty(def) => format!(
                "ALTER TABLE {} ADD {} {}",
                ident(table)?,
                ident(&def.key)?,
                def.ty.native_type()
            ),
        };
        Ok(Statement::new(text))
    }

    // ---- Writes ----

    pub fn insert_node(&self, node: &GraphNode, schema: &NodeSchema) -> TranslateResult<Statement> {
        let (assignments, statement) = bind_properties(
            Statement::new("").param("id", node.id.as_str()),
            &node.properties,
            &schema.properties,
        )?;
        let mut pairs = vec![format!("{}: $id", ID_COLUMN)];
        pairs.extend(assignments.iter().map(|(key, param)| format!("{}: ${}", key, param)));

        let text = format!(
            "CREATE (n:{} {{{}}}) RETURN n.{} AS id",
            ident(&schema.type_name)?,
            pairs.join(", "),
            ID_COLUMN
        );
        Ok(self.finish(Statement { text, ..statement }))
    }

    pub fn insert_edge(&self, edge: &GraphEdge, schema: &EdgeSchema) -> TranslateResult<Statement> {
        let base = Statement::new("")
            .param("src", edge.source_node_id.as_str())
            .param("dst", edge.target_node_id.as_str())
            .param("id", edge.id.as_str());
        let (assignments, statement) = bind_properties(base, &edge.properties, &schema.properties)?;
        let mut pairs = vec![format!("{}: $id", ID_COLUMN)];
        pairs.extend(assignments.iter().map(|(key, param)| format!("{}: ${}", key, param)));

        let text = format!(
            "MATCH (a:{from} {{{id}: $src}}), (b:{to} {{{id}: $dst}}) CREATE (a)-[r:{rel} {{{pairs}}}]->(b) RETURN r.{id} AS id",
            from = ident(&schema.from_type)?,
            to = ident(&schema.to_type)?,
            rel = ident(&schema.type_name)?,
            id = ID_COLUMN,
            pairs = pairs.join(", "),
        );
        Ok(self.finish(Statement { text, ..statement }))
    }

    /// One assignment per property present on the node
    pub fn update_node(&self, node: &GraphNode, schema: &NodeSchema) -> TranslateResult<Statement> {
        let base = Statement::new("").param("id", node.id.as_str());
        let (assignments, statement) = bind_present(base, &schema.type_name, &node.properties, &schema.properties)?;
        let text = format!(
            "MATCH (n:{} {{{}: $id}}){} RETURN n.{} AS id",
            ident(&schema.type_name)?,
            ID_COLUMN,
            set_clause("n", &assignments),
            ID_COLUMN
        );
        Ok(self.finish(Statement { text, ..statement }))
    }

    pub fn update_edge(&self, edge: &GraphEdge, schema: &EdgeSchema) -> TranslateResult<Statement> {
        let base = Statement::new("").param("id", edge.id.as_str());
        let (assignments, statement) = bind_present(base, &schema.type_name, &edge.properties, &schema.properties)?;
        let text = format!(
            "MATCH ()-[r:{} {{{}: $id}}]->(){} RETURN r.{} AS id",
            ident(&schema.type_name)?,
            ID_COLUMN,
            set_clause("r", &assignments),
            ID_COLUMN
        );
        Ok(self.finish(Statement { text, ..statement }))
    }

    pub fn delete_node(&self, type_name: &str, id: &str) -> TranslateResult<Statement> {
        let text = format!("MATCH (n:{} {{{}: $id}}) DETACH DELETE n", ident(type_name)?, ID_COLUMN);
        Ok(self.finish(Statement::new(text).param("id", id)))
    }

    pub fn delete_edge(&self, type_name: &str, id: &str) -> TranslateResult<Statement> {
        let text = format!("MATCH ()-[r:{} {{{}: $id}}]->() DELETE r", ident(type_name)?, ID_COLUMN);
        Ok(self.finish(Statement::new(text).param("id", id)))
    }

    // ---- Reads ----

    pub fn fetch_all_nodes(&self) -> Statement {
        Statement::new("MATCH (n) RETURN n")
    }

    pub fn fetch_all_edges(&self) -> Statement {
        Statement::new("MATCH ()-[r]->() RETURN r")
    }

    pub fn fetch_nodes_by_type(&self, type_name: &str) -> TranslateResult<Statement> {
        Ok(Statement::new(format!("MATCH (n:{}) RETURN n", ident(type_name)?)))
    }

    pub fn fetch_edges_by_type(&self, type_name: &str) -> TranslateResult<Statement> {
        Ok(Statement::new(format!("MATCH ()-[r:{}]->() RETURN r", ident(type_name)?)))
    }

    pub fn fetch_node(&self, id: &str) -> Statement {
        let text = format!("MATCH (n) WHERE n.{} = $id RETURN n", ID_COLUMN);
        self.finish(Statement::new(text).param("id", id))
    }

    pub fn fetch_edge(&self, id: &str) -> Statement {
        let text = format!("MATCH ()-[r]->() WHERE r.{} = $id RETURN r", ID_COLUMN);
        self.finish(Statement::new(text).param("id", id))
    }

    // ---- Introspection ----

    pub fn show_tables(&self) -> Statement {
        Statement::new("CALL SHOW_TABLES() RETURN name, type")
    }

    pub fn table_info(&self, table: &str) -> TranslateResult<Statement> {
        Ok(Statement::new(format!("CALL TABLE_INFO({}) RETURN name, type", quote(ident(table)?))))
    }

    pub fn show_connection(&self, table: &str) -> TranslateResult<Statement> {
        Ok(Statement::new(format!(
            "CALL SHOW_CONNECTION({}) RETURN source_table, destination_table",
            quote(ident(table)?)
        )))
    }
}

fn column_defs(properties: &[PropertyDefinition]) -> TranslateResult<Vec<String>> {
    properties
        .iter()
        .map(|p| Ok(format!("{} {}", ident(&p.key)?, p.ty.native_type())))
        .collect()
}

/// Bind every schema property in schema order; missing values become null
fn bind_properties(
    mut statement: Statement,
    properties: &[PropertyInstance],
    definitions: &[PropertyDefinition],
) -> TranslateResult<(Vec<(String, String)>, Statement)> {
    let mut assignments = Vec::with_capacity(definitions.len());
    for (idx, def) in definitions.iter().enumerate() {
        let value = properties
            .iter()
            .find(|p| p.key == def.key)
            .map(|p| &p.value)
            .unwrap_or(&Value::Null);
        let param = format!("p{}", idx);
        statement = statement.param(param.clone(), encode(value, def.ty)?);
        assignments.push((ident(&def.key)?.to_string(), param));
    }
    Ok((assignments, statement))
}

/// Bind only the properties present on the instance
fn bind_present(
    mut statement: Statement,
    type_name: &str,
    properties: &[PropertyInstance],
    definitions: &[PropertyDefinition],
) -> TranslateResult<(Vec<(String, String)>, Statement)> {
    let mut assignments = Vec::with_capacity(properties.len());
    for (idx, property) in properties.iter().enumerate() {
        let def = definitions
            .iter()
            .find(|d| d.key == property.key)
            .ok_or_else(|| TranslateError::UnknownProperty {
                type_name: type_name.to_string(),
                key: property.key.clone(),
            })?;
        let native: NativeValue = encode(&property.value, def.ty)?;
        let param = format!("p{}", idx);
        statement = statement.param(param.clone(), native);
        assignments.push((ident(&def.key)?.to_string(), param));
    }
    Ok((assignments, statement))
}

fn set_clause(variable: &str, assignments: &[(String, String)]) -> String {
    if assignments.is_empty() {
        return String::new();
    }
    let items: Vec<String> = assignments
        .iter()
        .map(|(key, param)| format!("{}.{} = ${}", variable, key, param))
        .collect();
    format!(" SET {}", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyType;

    fn person() -> NodeSchema {
        NodeSchema::new(
            "Person",
            vec![
                PropertyDefinition::new("name", PropertyType::Text),
                PropertyDefinition::new("age", PropertyType::Number),
            ],
        )
    }

    #[test]
    fn test_create_node_table() {
        let statement = QueryTranslator::default().create_node_table(&person()).unwrap();
        assert_eq!(
            statement.text,
            "CREATE NODE TABLE Person (id STRING, name STRING, age INT64, PRIMARY KEY (id))"
        );
    }

    #[test]
    fn test_create_rel_table() {
        let schema = EdgeSchema::new(
            "KNOWS",
            "Person",
            "Person",
            vec![PropertyDefinition::new("since", PropertyType::Number)],
        );
        let statement = QueryTranslator::default().create_rel_table(&schema).unwrap();
        assert_eq!(
            statement.text,
            "CREATE REL TABLE KNOWS (FROM Person TO Person, id STRING, since INT64)"
        );
    }

    #[test]
    fn test_identifiers_are_validated() {
        let translator = QueryTranslator::default();
        let err = translator.drop_table("Person; DROP TABLE X").unwrap_err();
        assert!(matches!(err, TranslateError::InvalidIdentifier(_)));
        assert!(translator.fetch_nodes_by_type("a b").is_err());
    }

    #[test]
    fn test_insert_node_binds_values() {
        let node = GraphNode::with_id("n1", "Person", vec![PropertyInstance::new("name", "O'Brien")]);
        let statement = QueryTranslator::default().insert_node(&node, &person()).unwrap();

        assert_eq!(
            statement.text,
            "CREATE (n:Person {id: $id, name: $p0, age: $p1}) RETURN n.id AS id"
        );
        assert_eq!(statement.params["id"], NativeValue::String("n1".into()));
        assert_eq!(statement.params["p0"], NativeValue::String("O'Brien".into()));
        assert!(statement.params["p1"].is_null());
    }

    #[test]
    fn test_insert_node_inline_mode() {
        let node = GraphNode::with_id("n1", "Person", vec![PropertyInstance::new("name", "O'Brien")]);
        let statement = QueryTranslator::new(ParameterMode::Inline)
            .insert_node(&node, &person())
            .unwrap();
        assert_eq!(
            statement.text,
            "CREATE (n:Person {id: 'n1', name: 'O\\'Brien', age: NULL}) RETURN n.id AS id"
        );
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_insert_edge() {
        let schema = EdgeSchema::new("KNOWS", "Person", "Person", vec![]);
        let mut edge = GraphEdge::new("KNOWS", "a", "b", vec![]);
        edge.id = "e1".to_string();
        let statement = QueryTranslator::default().insert_edge(&edge, &schema).unwrap();
        assert_eq!(
            statement.text,
            "MATCH (a:Person {id: $src}), (b:Person {id: $dst}) CREATE (a)-[r:KNOWS {id: $id}]->(b) RETURN r.id AS id"
        );
        assert_eq!(statement.params["src"], NativeValue::String("a".into()));
    }

    #[test]
    fn test_update_node_sets_present_keys() {
        let node = GraphNode::with_id("n1", "Person", vec![PropertyInstance::new("age", 31i64)]);
        let statement = QueryTranslator::default().update_node(&node, &person()).unwrap();
        assert_eq!(
            statement.text,
            "MATCH (n:Person {id: $id}) SET n.age = $p0 RETURN n.id AS id"
        );
        assert_eq!(statement.params["p0"], NativeValue::Int64(31));

        let stray = GraphNode::with_id("n1", "Person", vec![PropertyInstance::new("color", "red")]);
        assert!(matches!(
            QueryTranslator::default().update_node(&stray, &person()),
            Err(TranslateError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_encoding_failure_is_reported() {
        let node = GraphNode::with_id("n1", "Person", vec![PropertyInstance::new("age", "thirty")]);
        let err = QueryTranslator::default().insert_node(&node, &person()).unwrap_err();
        assert!(matches!(err, TranslateError::Codec(CodecError::Coercion { .. })));
    }

    #[test]
    fn test_alter_table() {
        let translator = QueryTranslator::default();
        let add = SchemaChange::AddProperty(PropertyDefinition::new("born", PropertyType::Date));
        assert_eq!(translator.alter_table("Person", &add).unwrap().text, "ALTER TABLE Person ADD born DATE");
        let drop = SchemaChange::DropProperty("age".to_string());
        assert_eq!(translator.alter_table("Person", &drop).unwrap().text, "ALTER TABLE Person DROP age");
        let rename = SchemaChange::RenameTable {
            from: "Person".to_string(),
            to: "Human".to_string(),
        };
        assert_eq!(
            translator.alter_table("Person", &rename).unwrap().text,
            "ALTER TABLE Person RENAME TO Human"
        );
    }

    #[test]
    fn test_introspection_statements() {
        let translator = QueryTranslator::default();
        assert_eq!(
            translator.table_info("Person").unwrap().text,
            "CALL TABLE_INFO('Person') RETURN name, type"
        );
        assert!(translator.show_connection("x'y").is_err());
    }
}
