//! In-memory schema registry of the active graph

use super::{
    normalize_property_key, validate_edge_type_name, validate_node_type_name, validate_property_key,
    EdgeSchema, NodeSchema, PropertyDefinition, SchemaError, SchemaResult,
};
use crate::graph::PropertyInstance;
use crate::value::{coerce, encode, Value};
use std::collections::HashSet;

/// One table alteration needed to move from an old schema to a new one
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    RenameTable { from: String, to: String },
    DropProperty(String),
    AddProperty(PropertyDefinition),
}

/// Owns the node and edge schemas of the active graph.
///
/// Schema ids are assigned here and stay stable across reloads as long as
/// the type name is unchanged.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    node_schemas: Vec<NodeSchema>,
    edge_schemas: Vec<EdgeSchema>,
    next_id: i64,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            node_schemas: Vec::new(),
            edge_schemas: Vec::new(),
            next_id: 1,
        }
    }

    pub fn node_schemas(&self) -> &[NodeSchema] {
        &self.node_schemas
    }

    pub fn edge_schemas(&self) -> &[EdgeSchema] {
        &self.edge_schemas
    }

    pub fn node_schema(&self, type_name: &str) -> Option<&NodeSchema> {
        self.node_schemas.iter().find(|s| s.type_name == type_name)
    }

    pub fn edge_schema(&self, type_name: &str) -> Option<&EdgeSchema> {
        self.edge_schemas.iter().find(|s| s.type_name == type_name)
    }

    pub fn node_schema_by_id(&self, id: i64) -> Option<&NodeSchema> {
        self.node_schemas.iter().find(|s| s.id == id)
    }

    pub fn edge_schema_by_id(&self, id: i64) -> Option<&EdgeSchema> {
        self.edge_schemas.iter().find(|s| s.id == id)
    }

    fn fresh_id(&mut self) -> i64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    fn name_taken(&self, type_name: &str, except_id: Option<i64>) -> bool {
        let node_clash = self
            .node_schemas
            .iter()
            .any(|s| s.type_name == type_name && Some(s.id) != except_id);
        let edge_clash = self
            .edge_schemas
            .iter()
            .any(|s| s.type_name == type_name && Some(s.id) != except_id);
        node_clash || edge_clash
    }

    /// Validate a new node schema and give it a fresh id.
    ///
    /// Property keys are normalised. The registry itself is not changed.
    pub fn prepare_node_schema(&mut self, mut schema: NodeSchema) -> SchemaResult<NodeSchema> {
        validate_node_type_name(&schema.type_name)?;
        if self.name_taken(&schema.type_name, None) {
            return Err(SchemaError::DuplicateTypeName(schema.type_name));
        }
        schema.properties = normalize_properties(&schema.type_name, schema.properties)?;
        schema.id = self.fresh_id();
        Ok(schema)
    }

    /// Validate a new edge schema (including its endpoint types) and give it a fresh id.
    pub fn prepare_edge_schema(&mut self, mut schema: EdgeSchema) -> SchemaResult<EdgeSchema> {
        validate_edge_type_name(&schema.type_name)?;
        if self.name_taken(&schema.type_name, None) {
            return Err(SchemaError::DuplicateTypeName(schema.type_name));
        }
        self.check_endpoints(&schema)?;
        schema.properties = normalize_properties(&schema.type_name, schema.properties)?;
        schema.id = self.fresh_id();
        Ok(schema)
    }

    /// Validate a replacement for an existing node schema (matched by id).
    ///
    /// Returns the current definition, the normalised replacement and the
    /// table changes between them.
    pub fn prepare_node_update(
        &self,
        mut schema: NodeSchema,
    ) -> SchemaResult<(NodeSchema, NodeSchema, Vec<SchemaChange>)> {
        let old = self
            .node_schema_by_id(schema.id)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownSchema(format!("node schema #{}", schema.id)))?;
        validate_node_type_name(&schema.type_name)?;
        if self.name_taken(&schema.type_name, Some(schema.id)) {
            return Err(SchemaError::DuplicateTypeName(schema.type_name));
        }
        schema.properties = normalize_properties(&schema.type_name, schema.properties)?;
        let changes = schema_changes(&old.type_name, &old.properties, &schema.type_name, &schema.properties);
        Ok((old, schema, changes))
    }

    /// Edge counterpart of [`SchemaRegistry::prepare_node_update`].
    ///
    /// Endpoint types cannot change, since the backing relation is bound to them.
    pub fn prepare_edge_update(
        &self,
        mut schema: EdgeSchema,
    ) -> SchemaResult<(EdgeSchema, EdgeSchema, Vec<SchemaChange>)> {
        let old = self
            .edge_schema_by_id(schema.id)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownSchema(format!("edge schema #{}", schema.id)))?;
        validate_edge_type_name(&schema.type_name)?;
        if self.name_taken(&schema.type_name, Some(schema.id)) {
            return Err(SchemaError::DuplicateTypeName(schema.type_name));
        }
        if schema.from_type != old.from_type || schema.to_type != old.to_type {
            return Err(SchemaError::UnknownEndpointType(format!(
                "{} -> {} (was {} -> {})",
                schema.from_type, schema.to_type, old.from_type, old.to_type
            )));
        }
        schema.properties = normalize_properties(&schema.type_name, schema.properties)?;
        let changes = schema_changes(&old.type_name, &old.properties, &schema.type_name, &schema.properties);
        Ok((old, schema, changes))
    }

    fn check_endpoints(&self, schema: &EdgeSchema) -> SchemaResult<()> {
        for endpoint in [&schema.from_type, &schema.to_type] {
            if self.node_schema(endpoint).is_none() {
                return Err(SchemaError::UnknownEndpointType(endpoint.clone()));
            }
        }
        Ok(())
    }

    pub fn insert_node_schema(&mut self, schema: NodeSchema) {
        self.next_id = self.next_id.max(schema.id + 1);
        match self.node_schemas.iter_mut().find(|s| s.id == schema.id) {
            Some(existing) => *existing = schema,
            None => self.node_schemas.push(schema),
        }
    }

    pub fn insert_edge_schema(&mut self, schema: EdgeSchema) {
        self.next_id = self.next_id.max(schema.id + 1);
        match self.edge_schemas.iter_mut().find(|s| s.id == schema.id) {
            Some(existing) => *existing = schema,
            None => self.edge_schemas.push(schema),
        }
    }

    pub fn remove_node_schema(&mut self, id: i64) -> Option<NodeSchema> {
        let idx = self.node_schemas.iter().position(|s| s.id == id)?;
        Some(self.node_schemas.remove(idx))
    }

    pub fn remove_edge_schema(&mut self, id: i64) -> Option<EdgeSchema> {
        let idx = self.edge_schemas.iter().position(|s| s.id == id)?;
        Some(self.edge_schemas.remove(idx))
    }

    /// Replace the registry contents with schemas read back from the engine.
    ///
    /// Schemas are matched to the previous contents by type name and keep
    /// their id. Properties are matched by key and keep their id, declared
    /// type and index flags when the stored column type is unchanged.
    pub fn reconcile(&mut self, nodes: Vec<NodeSchema>, edges: Vec<EdgeSchema>) {
        let previous = std::mem::take(self);
        self.next_id = previous.next_id.max(1);

        for mut schema in nodes {
            match previous.node_schema(&schema.type_name) {
                Some(prev) => {
                    schema.id = prev.id;
                    schema.allow_semi_structured = prev.allow_semi_structured;
                    schema.properties = reconcile_properties(&prev.properties, schema.properties);
                }
                None => schema.id = self.fresh_id(),
            }
            self.insert_node_schema(schema);
        }

        for mut schema in edges {
            match previous.edge_schema(&schema.type_name) {
                Some(prev) => {
                    schema.id = prev.id;
                    schema.allow_semi_structured = prev.allow_semi_structured;
                    schema.properties = reconcile_properties(&prev.properties, schema.properties);
                }
                None => schema.id = self.fresh_id(),
            }
            self.insert_edge_schema(schema);
        }
    }
}

fn normalize_properties(
    schema_name: &str,
    properties: Vec<PropertyDefinition>,
) -> SchemaResult<Vec<PropertyDefinition>> {
    let mut seen = HashSet::with_capacity(properties.len());
    properties
        .into_iter()
        .map(|mut p| {
            p.key = normalize_property_key(&p.key);
            validate_property_key(&p.key)?;
            if !seen.insert(p.key.clone()) {
                return Err(SchemaError::DuplicatePropertyKey {
                    schema: schema_name.to_string(),
                    key: p.key,
                });
            }
            Ok(p)
        })
        .collect()
}

fn reconcile_properties(
    previous: &[PropertyDefinition],
    loaded: Vec<PropertyDefinition>,
) -> Vec<PropertyDefinition> {
    loaded
        .into_iter()
        .map(|p| match previous.iter().find(|old| old.key == p.key) {
            Some(old) if old.ty.native_type() == p.ty.native_type() => old.clone(),
            _ => p,
        })
        .collect()
}

fn schema_changes(
    old_name: &str,
    old: &[PropertyDefinition],
    new_name: &str,
    new: &[PropertyDefinition],
) -> Vec<SchemaChange> {
    let mut changes = Vec::new();
    if old_name != new_name {
        changes.push(SchemaChange::RenameTable {
            from: old_name.to_string(),
            to: new_name.to_string(),
        });
    }
    changes.extend(diff_properties(old, new));
    changes
}

/// Column changes between two property lists, matched by key.
///
/// A key whose stored column type changes is dropped and re-added.
pub fn diff_properties(old: &[PropertyDefinition], new: &[PropertyDefinition]) -> Vec<SchemaChange> {
    let mut drops = Vec::new();
    let mut adds = Vec::new();

    for o in old {
        match new.iter().find(|n| n.key == o.key) {
            None => drops.push(SchemaChange::DropProperty(o.key.clone())),
            Some(n) if n.ty.native_type() != o.ty.native_type() => {
                drops.push(SchemaChange::DropProperty(o.key.clone()));
                adds.push(SchemaChange::AddProperty(n.clone()));
            }
            Some(_) => {}
        }
    }
    for n in new {
        if !old.iter().any(|o| o.key == n.key) {
            adds.push(SchemaChange::AddProperty(n.clone()));
        }
    }

    drops.extend(adds);
    drops
}

/// Property list of an instance after its schema changed.
///
/// Follows the new definitions in order. Existing values are kept (converted
/// to the new type where needed); missing, null or unconvertible values get
/// the type's default. Keys not in the new schema are dropped.
pub fn rebuild_properties(
    existing: &[PropertyInstance],
    definitions: &[PropertyDefinition],
) -> Vec<PropertyInstance> {
    definitions
        .iter()
        .map(|def| {
            let kept = existing
                .iter()
                .find(|p| p.key == def.key)
                .map(|p| coerce(p.value.clone(), def.ty))
                .filter(|v| !v.is_null() && encode(v, def.ty).is_ok());
            let value: Value = kept.unwrap_or_else(|| def.ty.default_value());
            PropertyInstance::new(def.key.clone(), value)
        })
        .collect()
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
    fn test_prepare_assigns_ids_and_rejects_duplicates() {
        let mut registry = SchemaRegistry::new();
        let a = registry.prepare_node_schema(person()).unwrap();
        registry.insert_node_schema(a.clone());
        assert_eq!(a.id, 1);

        let err = registry.prepare_node_schema(person()).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateTypeName("Person".to_string()));

        let b = registry.prepare_node_schema(NodeSchema::new("Place", vec![])).unwrap();
        assert_eq!(b.id, 2);
    }

    #[test]
    fn test_prepare_normalizes_and_validates_keys() {
        let mut registry = SchemaRegistry::new();
        let schema = NodeSchema::new("Note", vec![PropertyDefinition::new(" first name ", PropertyType::Text)]);
        let prepared = registry.prepare_node_schema(schema).unwrap();
        assert_eq!(prepared.properties[0].key, "first_name");

        let dup = NodeSchema::new(
            "Dup",
            vec![
                PropertyDefinition::new("a b", PropertyType::Text),
                PropertyDefinition::new("a_b", PropertyType::Number),
            ],
        );
        assert!(matches!(
            registry.prepare_node_schema(dup),
            Err(SchemaError::DuplicatePropertyKey { .. })
        ));

        let reserved = NodeSchema::new("Bad", vec![PropertyDefinition::new("id", PropertyType::Text)]);
        assert!(matches!(
            registry.prepare_node_schema(reserved),
            Err(SchemaError::ReservedPropertyKey(_))
        ));
    }

    #[test]
    fn test_edge_requires_known_endpoints() {
        let mut registry = SchemaRegistry::new();
        let p = registry.prepare_node_schema(person()).unwrap();
        registry.insert_node_schema(p);

        let ok = EdgeSchema::new("KNOWS", "Person", "Person", vec![]);
        assert!(registry.prepare_edge_schema(ok).is_ok());

        let bad = EdgeSchema::new("LIVES_IN", "Person", "City", vec![]);
        assert_eq!(
            registry.prepare_edge_schema(bad),
            Err(SchemaError::UnknownEndpointType("City".to_string()))
        );

        let lower = EdgeSchema::new("knows", "Person", "Person", vec![]);
        assert!(matches!(
            registry.prepare_edge_schema(lower),
            Err(SchemaError::InvalidTypeName { .. })
        ));
    }

    #[test]
    fn test_diff_properties() {
        let old = person().properties;
        let mut new = old.clone();
        new.remove(0);
        new[0].ty = PropertyType::Text;
        new.push(PropertyDefinition::new("active", PropertyType::Boolean));

        let changes = diff_properties(&old, &new);
        assert_eq!(changes.len(), 4);
        assert_eq!(changes[0], SchemaChange::DropProperty("name".to_string()));
        assert_eq!(changes[1], SchemaChange::DropProperty("age".to_string()));
        assert!(matches!(&changes[2], SchemaChange::AddProperty(p) if p.key == "age"));
        assert!(matches!(&changes[3], SchemaChange::AddProperty(p) if p.key == "active"));
    }

    #[test]
    fn test_same_column_type_needs_no_change() {
        let old = vec![PropertyDefinition::new("body", PropertyType::Text)];
        let mut new = old.clone();
        new[0].ty = PropertyType::LongText;
        assert!(diff_properties(&old, &new).is_empty());
    }

    #[test]
    fn test_update_detects_rename() {
        let mut registry = SchemaRegistry::new();
        let p = registry.prepare_node_schema(person()).unwrap();
        registry.insert_node_schema(p.clone());

        let mut renamed = p.clone();
        renamed.type_name = "Human".to_string();
        let (old, new, changes) = registry.prepare_node_update(renamed).unwrap();
        assert_eq!(old.type_name, "Person");
        assert_eq!(new.type_name, "Human");
        assert_eq!(
            changes,
            vec![SchemaChange::RenameTable { from: "Person".to_string(), to: "Human".to_string() }]
        );
    }

    #[test]
    fn test_rebuild_keeps_values_and_seeds_defaults() {
        let existing = vec![
            PropertyInstance::new("name", Value::from("A")),
            PropertyInstance::new("age", Value::from(1)),
        ];
        let mut defs = person().properties;
        defs.push(PropertyDefinition::new("active", PropertyType::Boolean));

        let rebuilt = rebuild_properties(&existing, &defs);
        assert_eq!(
            rebuilt,
            vec![
                PropertyInstance::new("name", Value::from("A")),
                PropertyInstance::new("age", Value::from(1)),
                PropertyInstance::new("active", Value::Bool(false)),
            ]
        );
    }

    #[test]
    fn test_rebuild_drops_stale_keys_and_redefaults_nulls() {
        let existing = vec![
            PropertyInstance::new("name", Value::Null),
            PropertyInstance::new("age", Value::from(1)),
        ];
        let defs = vec![PropertyDefinition::new("name", PropertyType::Text)];
        let rebuilt = rebuild_properties(&existing, &defs);
        assert_eq!(rebuilt, vec![PropertyInstance::new("name", Value::from(""))]);
    }

    #[test]
    fn test_rebuild_converts_retyped_values() {
        let existing = vec![PropertyInstance::new("age", Value::from("42"))];
        let defs = vec![PropertyDefinition::new("age", PropertyType::Number)];
        assert_eq!(rebuild_properties(&existing, &defs)[0].value, Value::Integer(42));

        let unconvertible = vec![PropertyInstance::new("age", Value::from("old"))];
        assert_eq!(rebuild_properties(&unconvertible, &defs)[0].value, Value::Integer(0));
    }

    #[test]
    fn test_reconcile_keeps_ids_and_declared_types() {
        let mut registry = SchemaRegistry::new();
        let mut schema = NodeSchema::new(
            "Note",
            vec![
                PropertyDefinition::new("body", PropertyType::LongText).full_text_indexed(),
                PropertyDefinition::new("tags", PropertyType::List),
            ],
        );
        schema = registry.prepare_node_schema(schema).unwrap();
        registry.insert_node_schema(schema.clone());

        // What a reload recovers from the column types alone
        let loaded = NodeSchema::new(
            "Note",
            vec![
                PropertyDefinition::new("body", PropertyType::Text),
                PropertyDefinition::new("tags", PropertyType::Text),
                PropertyDefinition::new("extra", PropertyType::Number),
            ],
        );
        registry.reconcile(vec![loaded], vec![]);

        let note = registry.node_schema("Note").unwrap().clone();
        assert_eq!(note.id, schema.id);
        assert_eq!(note.properties[0], schema.properties[0]);
        assert_eq!(note.properties[1].ty, PropertyType::List);
        assert_eq!(note.properties[2].key, "extra");

        let fresh = registry.prepare_node_schema(NodeSchema::new("Other", vec![])).unwrap();
        assert!(fresh.id > note.id);
    }
}
