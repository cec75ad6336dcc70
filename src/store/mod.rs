//! Reactive property graph store
//!
//! Holds the registered note graphs and the selected one, owns the single
//! engine connection and exposes the CRUD surface. Every mutation is followed
//! by a full reload of the selected graph, which is then published to
//! subscribers.
//!
//! The public operations report success as `bool`, `Option` or an empty
//! result. The reason for a failure is published on a separate channel
//! (see [`PropertyGraphStore::subscribe_failures`] and
//! [`PropertyGraphStore::last_failure`]).

pub(crate) mod reload;

use crate::config::StoreConfig;
use crate::engine::{Connector, EmbeddedConnector, GraphDatabase, NativeResult};
use crate::error::{FailureKind, NoteGraphError, NoteGraphResult};
use crate::graph::note_graph::is_volatile;
use crate::graph::{GraphEdge, GraphNode, NoteGraph};
use crate::query::{ParameterMode, QueryResult, QueryTranslator, Statement};
use crate::schema::{rebuild_properties, EdgeSchema, NodeSchema, SchemaChange, SchemaError, SchemaRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

const FAILURE_CHANNEL_CAPACITY: usize = 64;

/// A failed store operation
#[derive(Debug, Clone, PartialEq)]
pub struct StoreFailure {
    pub operation: String,
    pub kind: FailureKind,
    pub message: String,
}

struct Connection {
    graph_id: Uuid,
    path: PathBuf,
    db: Arc<dyn GraphDatabase>,
    translator: QueryTranslator,
}

#[derive(Default)]
struct State {
    connection: Option<Connection>,
    graphs: Vec<NoteGraph>,
    selected: Option<Uuid>,
    registry: SchemaRegistry,
}

impl State {
    fn connection(&self) -> NoteGraphResult<(Arc<dyn GraphDatabase>, QueryTranslator)> {
        self.connection
            .as_ref()
            .map(|c| (c.db.clone(), c.translator))
            .ok_or(NoteGraphError::NoActiveGraph)
    }

    fn selected_graph(&self) -> NoteGraphResult<&NoteGraph> {
        let id = self.selected.ok_or(NoteGraphError::NoActiveGraph)?;
        self.graphs
            .iter()
            .find(|g| g.id == id)
            .ok_or(NoteGraphError::UnknownGraph(id))
    }

    fn node_schema(&self, type_name: &str) -> NoteGraphResult<NodeSchema> {
        self.registry
            .node_schema(type_name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownSchema(type_name.to_string()).into())
    }

    fn edge_schema(&self, type_name: &str) -> NoteGraphResult<EdgeSchema> {
        self.registry
            .edge_schema(type_name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownSchema(type_name.to_string()).into())
    }
}

/// Store of note graphs backed by one open database at a time
pub struct PropertyGraphStore {
    config: StoreConfig,
    connector: Arc<dyn Connector>,
    state: Mutex<State>,
    graphs_tx: watch::Sender<Vec<NoteGraph>>,
    selected_tx: watch::Sender<Option<NoteGraph>>,
    failures_tx: broadcast::Sender<StoreFailure>,
    last_failure: watch::Sender<Option<StoreFailure>>,
}

impl PropertyGraphStore {
    pub fn new(config: StoreConfig, connector: Arc<dyn Connector>) -> Self {
        let (failures_tx, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self {
            config,
            connector,
            state: Mutex::new(State::default()),
            graphs_tx: watch::Sender::new(Vec::new()),
            selected_tx: watch::Sender::new(None),
            failures_tx,
            last_failure: watch::Sender::new(None),
        }
    }

    /// Store backed by the in-process engine
    pub fn embedded(config: StoreConfig) -> Self {
        Self::new(config, Arc::new(EmbeddedConnector::new()))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ---- Subscriptions ----

    pub fn subscribe_note_graphs(&self) -> watch::Receiver<Vec<NoteGraph>> {
        self.graphs_tx.subscribe()
    }

    pub fn subscribe_selected(&self) -> watch::Receiver<Option<NoteGraph>> {
        self.selected_tx.subscribe()
    }

    pub fn subscribe_failures(&self) -> broadcast::Receiver<StoreFailure> {
        self.failures_tx.subscribe()
    }

    pub fn note_graphs(&self) -> Vec<NoteGraph> {
        self.graphs_tx.borrow().clone()
    }

    pub fn selected_note_graph(&self) -> Option<NoteGraph> {
        self.selected_tx.borrow().clone()
    }

    /// The most recent failure of any operation
    pub fn last_failure(&self) -> Option<StoreFailure> {
        self.last_failure.borrow().clone()
    }

    fn record(&self, operation: &str, kind: FailureKind, message: String) {
        warn!(operation, %kind, "{}", message);
        let failure = StoreFailure {
            operation: operation.to_string(),
            kind,
            message,
        };
        self.last_failure.send_replace(Some(failure.clone()));
        // no subscribers is fine
        let _ = self.failures_tx.send(failure);
    }

    fn report<T>(&self, operation: &str, result: NoteGraphResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.record(operation, e.kind(), e.to_string());
                None
            }
        }
    }

    fn publish(&self, state: &State) {
        self.graphs_tx.send_replace(state.graphs.clone());
        self.selected_tx.send_replace(state.selected_graph().ok().cloned());
    }

    // ---- Graph collection ----

    /// Create the graph directory, register it and select it
    pub async fn create_note_graph(&self, dir: impl AsRef<Path>) -> Option<NoteGraph> {
        let result = self.try_create_note_graph(dir.as_ref()).await;
        self.report("create_note_graph", result)
    }

    async fn try_create_note_graph(&self, dir: &Path) -> NoteGraphResult<NoteGraph> {
        if !is_volatile(dir) && self.config.create_missing_dirs {
            tokio::fs::create_dir_all(dir).await?;
        }
        let graph = self.add_note_graph(dir).await;
        self.try_select(graph.id).await?;
        self.selected_note_graph().ok_or(NoteGraphError::NoActiveGraph)
    }

    /// Register an existing graph directory without opening it
    pub async fn add_note_graph(&self, dir: impl AsRef<Path>) -> NoteGraph {
        let graph = NoteGraph::new(dir.as_ref());
        let mut state = self.state.lock().await;
        state.graphs.push(graph.clone());
        self.publish(&state);
        info!("Registered note graph {}", graph.name());
        graph
    }

    /// Unregister a graph, closing its connection if it is selected
    pub async fn remove_note_graph(&self, id: Uuid) -> bool {
        let result = self.try_remove_note_graph(id).await;
        self.report("remove_note_graph", result).is_some()
    }

    async fn try_remove_note_graph(&self, id: Uuid) -> NoteGraphResult<()> {
        let mut state = self.state.lock().await;
        let idx = state
            .graphs
            .iter()
            .position(|g| g.id == id)
            .ok_or(NoteGraphError::UnknownGraph(id))?;
        let removed = state.graphs.remove(idx);
        if state.selected == Some(id) {
            Self::disconnect(&mut state).await;
        }
        self.publish(&state);
        info!("Removed note graph {}", removed.name());
        Ok(())
    }

    /// Select a graph, reopening the database if it lives elsewhere, and reload it
    pub async fn select_note_graph(&self, id: Uuid) -> bool {
        let result = self.try_select(id).await;
        self.report("select_note_graph", result).is_some()
    }

    async fn try_select(&self, id: Uuid) -> NoteGraphResult<()> {
        let mut state = self.state.lock().await;
        let graph = state
            .graphs
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or(NoteGraphError::UnknownGraph(id))?;
        let path = graph.database_path(&self.config.database_file);

        let reuse = state
            .connection
            .as_ref()
            .is_some_and(|c| c.graph_id == id || (c.path == path && !is_volatile(&path)));
        if !reuse {
            let db = self.connector.connect(&path).await?;
            Self::disconnect(&mut state).await;
            let mode = if db.supports_parameters() {
                self.config.parameter_mode
            } else {
                ParameterMode::Inline
            };
            info!("Opened {} for note graph {}", path.display(), graph.name());
            state.connection = Some(Connection {
                graph_id: id,
                path,
                db,
                translator: QueryTranslator::new(mode),
            });
        } else if let Some(connection) = state.connection.as_mut() {
            connection.graph_id = id;
        }

        state.selected = Some(id);
        info!("Selected note graph {}", graph.name());
        self.reload_locked(&mut state).await
    }

    /// Close the open database and clear the selection
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        Self::disconnect(&mut state).await;
        self.publish(&state);
    }

    async fn disconnect(state: &mut State) {
        if let Some(connection) = state.connection.take() {
            connection.db.close().await;
            info!("Closed {}", connection.path.display());
        }
        state.selected = None;
        state.registry = SchemaRegistry::new();
    }

    // ---- Reload ----

    /// Resynchronise the selected graph from the database
    pub async fn reload(&self) -> bool {
        let mut state = self.state.lock().await;
        let result = self.reload_locked(&mut state).await;
        self.report("reload", result).is_some()
    }

    async fn reload_locked(&self, state: &mut State) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let selected = state.selected.ok_or(NoteGraphError::NoActiveGraph)?;

        let (node_schemas, edge_schemas) = reload::load_schemas(db.as_ref(), &translator).await?;
        state.registry.reconcile(node_schemas, edge_schemas);
        let loaded = reload::load_instances(
            db.as_ref(),
            &translator,
            state.registry.node_schemas(),
            state.registry.edge_schemas(),
        )
        .await?;
        for error in &loaded.errors {
            self.record("reload", FailureKind::UnsupportedType, error.to_string());
        }

        let graph = state
            .graphs
            .iter_mut()
            .find(|g| g.id == selected)
            .ok_or(NoteGraphError::UnknownGraph(selected))?;
        graph.node_schemas = state.registry.node_schemas().to_vec();
        graph.edge_schemas = state.registry.edge_schemas().to_vec();
        graph.nodes = loaded.nodes;
        graph.edges = loaded.edges;
        info!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Reloaded note graph {}",
            graph.name()
        );

        self.publish(state);
        Ok(())
    }

    /// Reload after a mutation, whether it succeeded or not, and keep the
    /// mutation's error if it failed
    async fn settle(&self, state: &mut State, result: NoteGraphResult<()>) -> NoteGraphResult<()> {
        match result {
            Ok(()) => self.reload_locked(state).await,
            Err(e) => {
                if state.connection.is_some() {
                    if let Err(reload) = self.reload_locked(state).await {
                        warn!("Reload after failed operation also failed: {}", reload);
                    }
                }
                Err(e)
            }
        }
    }

    // ---- Schemas ----

    pub async fn add_node_schema(&self, schema: NodeSchema) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_add_node_schema(&mut state, schema).await;
        let result = self.settle(&mut state, result).await;
        self.report("add_node_schema", result).is_some()
    }

    async fn apply_add_node_schema(state: &mut State, schema: NodeSchema) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let schema = state.registry.prepare_node_schema(schema)?;
        db.execute(&translator.create_node_table(&schema)?).await?;
        state.registry.insert_node_schema(schema);
        Ok(())
    }

    pub async fn add_edge_schema(&self, schema: EdgeSchema) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_add_edge_schema(&mut state, schema).await;
        let result = self.settle(&mut state, result).await;
        self.report("add_edge_schema", result).is_some()
    }

    async fn apply_add_edge_schema(state: &mut State, schema: EdgeSchema) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let schema = state.registry.prepare_edge_schema(schema)?;
        db.execute(&translator.create_rel_table(&schema)?).await?;
        state.registry.insert_edge_schema(schema);
        Ok(())
    }

    /// Replace a node schema (matched by id), alter its table and rebuild
    /// every instance against the new property list
    pub async fn update_node_schema(&self, schema: NodeSchema) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_update_node_schema(&mut state, schema).await;
        let result = self.settle(&mut state, result).await;
        self.report("update_node_schema", result).is_some()
    }

    async fn apply_update_node_schema(state: &mut State, schema: NodeSchema) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let (old, new, changes) = state.registry.prepare_node_update(schema)?;
        let instances: Vec<GraphNode> = state.selected_graph()?.nodes_of_type(&old.type_name).cloned().collect();

        alter(db.as_ref(), &translator, &old.type_name, &changes).await?;
        state.registry.insert_node_schema(new.clone());

        for mut node in instances {
            node.properties = rebuild_properties(&node.properties, &new.properties);
            node.type_name = new.type_name.clone();
            let result = db.execute(&translator.update_node(&node, &new)?).await?;
            if result.is_empty() {
                return Err(NoteGraphError::Write(format!("Node {} disappeared during schema update", node.id)));
            }
        }
        Ok(())
    }

    pub async fn update_edge_schema(&self, schema: EdgeSchema) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_update_edge_schema(&mut state, schema).await;
        let result = self.settle(&mut state, result).await;
        self.report("update_edge_schema", result).is_some()
    }

    async fn apply_update_edge_schema(state: &mut State, schema: EdgeSchema) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let (old, new, changes) = state.registry.prepare_edge_update(schema)?;
        let instances: Vec<GraphEdge> = state.selected_graph()?.edges_of_type(&old.type_name).cloned().collect();

        alter(db.as_ref(), &translator, &old.type_name, &changes).await?;
        state.registry.insert_edge_schema(new.clone());

        for mut edge in instances {
            edge.properties = rebuild_properties(&edge.properties, &new.properties);
            edge.type_name = new.type_name.clone();
            let result = db.execute(&translator.update_edge(&edge, &new)?).await?;
            if result.is_empty() {
                return Err(NoteGraphError::Write(format!("Edge {} disappeared during schema update", edge.id)));
            }
        }
        Ok(())
    }

    /// Drop a node schema and its table. Destructive.
    pub async fn remove_node_schema(&self, id: i64) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_remove_node_schema(&mut state, id).await;
        let result = self.settle(&mut state, result).await;
        self.report("remove_node_schema", result).is_some()
    }

    async fn apply_remove_node_schema(state: &mut State, id: i64) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let schema = state
            .registry
            .node_schema_by_id(id)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownSchema(format!("node schema #{}", id)))?;
        db.execute(&translator.drop_table(&schema.type_name)?).await?;
        state.registry.remove_node_schema(id);
        Ok(())
    }

    pub async fn remove_edge_schema(&self, id: i64) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_remove_edge_schema(&mut state, id).await;
        let result = self.settle(&mut state, result).await;
        self.report("remove_edge_schema", result).is_some()
    }

    async fn apply_remove_edge_schema(state: &mut State, id: i64) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let schema = state
            .registry
            .edge_schema_by_id(id)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownSchema(format!("edge schema #{}", id)))?;
        db.execute(&translator.drop_table(&schema.type_name)?).await?;
        state.registry.remove_edge_schema(id);
        Ok(())
    }

    // ---- Nodes and edges ----

    pub async fn add_node(&self, node: GraphNode) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_add_node(&state, &node).await;
        let result = self.settle(&mut state, result).await;
        self.report("add_node", result).is_some()
    }

    async fn apply_add_node(state: &State, node: &GraphNode) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let schema = state.node_schema(&node.type_name)?;
        let created = db.execute(&translator.insert_node(node, &schema)?).await?;
        expect_rows(created, || format!("Node {} was not created", node.id))
    }

    /// Update the properties present on `node`
    pub async fn update_node(&self, node: GraphNode) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_update_node(&state, &node).await;
        let result = self.settle(&mut state, result).await;
        self.report("update_node", result).is_some()
    }

    async fn apply_update_node(state: &State, node: &GraphNode) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let schema = state.node_schema(&node.type_name)?;
        let updated = db.execute(&translator.update_node(node, &schema)?).await?;
        expect_rows(updated, || format!("Node {} does not exist", node.id))
    }

    /// Delete a node together with its edges
    pub async fn remove_node(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_remove_node(&state, id).await;
        let result = self.settle(&mut state, result).await;
        self.report("remove_node", result).is_some()
    }

    async fn apply_remove_node(state: &State, id: &str) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let type_name = state
            .selected_graph()?
            .node(id)
            .map(|n| n.type_name.clone())
            .ok_or_else(|| NoteGraphError::Write(format!("Node {} does not exist", id)))?;
        db.execute(&translator.delete_node(&type_name, id)?).await?;
        Ok(())
    }

    /// Insert an edge; both endpoints must already exist
    pub async fn add_edge(&self, edge: GraphEdge) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_add_edge(&state, &edge).await;
        let result = self.settle(&mut state, result).await;
        self.report("add_edge", result).is_some()
    }

    async fn apply_add_edge(state: &State, edge: &GraphEdge) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let schema = state.edge_schema(&edge.type_name)?;
        let created = db.execute(&translator.insert_edge(edge, &schema)?).await?;
        expect_rows(created, || {
            format!(
                "Edge {} was not created: endpoints {} -> {} not found",
                edge.id, edge.source_node_id, edge.target_node_id
            )
        })
    }

    pub async fn update_edge(&self, edge: GraphEdge) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_update_edge(&state, &edge).await;
        let result = self.settle(&mut state, result).await;
        self.report("update_edge", result).is_some()
    }

    async fn apply_update_edge(state: &State, edge: &GraphEdge) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let schema = state.edge_schema(&edge.type_name)?;
        let updated = db.execute(&translator.update_edge(edge, &schema)?).await?;
        expect_rows(updated, || format!("Edge {} does not exist", edge.id))
    }

    pub async fn remove_edge(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        let result = Self::apply_remove_edge(&state, id).await;
        let result = self.settle(&mut state, result).await;
        self.report("remove_edge", result).is_some()
    }

    async fn apply_remove_edge(state: &State, id: &str) -> NoteGraphResult<()> {
        let (db, translator) = state.connection()?;
        let type_name = state
            .selected_graph()?
            .edge(id)
            .map(|e| e.type_name.clone())
            .ok_or_else(|| NoteGraphError::Write(format!("Edge {} does not exist", id)))?;
        db.execute(&translator.delete_edge(&type_name, id)?).await?;
        Ok(())
    }

    // ---- Queries ----

    /// Run arbitrary query text, then reload since it may have written
    pub async fn execute_query(&self, text: &str) -> QueryResult {
        let result = self.try_execute_query(text).await;
        self.report("execute_query", result).unwrap_or_default()
    }

    async fn try_execute_query(&self, text: &str) -> NoteGraphResult<QueryResult> {
        let mut state = self.state.lock().await;
        let (db, translator) = state.connection()?;
        let native = match db.execute(&translator.raw(text)).await {
            Ok(native) => native,
            Err(e) => {
                self.settle(&mut state, Err(e.into())).await?;
                return Ok(QueryResult::default());
            }
        };

        let (result, errors) = QueryResult::from_native(native);
        for error in errors {
            self.record("execute_query", FailureKind::UnsupportedType, error.to_string());
        }
        if let Err(e) = self.reload_locked(&mut state).await {
            self.record("execute_query", e.kind(), e.to_string());
        }
        Ok(result)
    }

    async fn read(&self, statement: NoteGraphResult<Statement>) -> NoteGraphResult<(NativeResult, SchemaRegistry)> {
        let state = self.state.lock().await;
        let (db, _) = state.connection()?;
        let result = db.execute(&statement?).await?;
        Ok((result, state.registry.clone()))
    }

    /// Nodes of one type, read from the database rather than the snapshot
    pub async fn fetch_nodes_by_type(&self, type_name: &str) -> Vec<GraphNode> {
        let result = self.try_fetch_nodes(|t| Ok(t.fetch_nodes_by_type(type_name)?)).await;
        self.report("fetch_nodes_by_type", result).unwrap_or_default()
    }

    pub async fn fetch_node(&self, id: &str) -> Option<GraphNode> {
        let result = self.try_fetch_nodes(|t| Ok(t.fetch_node(id))).await;
        self.report("fetch_node", result).and_then(|nodes| nodes.into_iter().next())
    }

    async fn try_fetch_nodes<F>(&self, build: F) -> NoteGraphResult<Vec<GraphNode>>
    where
        F: FnOnce(&QueryTranslator) -> NoteGraphResult<Statement>,
    {
        let statement = self.translator().await.and_then(|t| build(&t));
        let (result, registry) = self.read(statement).await?;
        let mut errors = Vec::new();
        let nodes = reload::nodes_from_result(&result, registry.node_schemas(), &mut errors);
        for error in errors {
            self.record("fetch", FailureKind::UnsupportedType, error.to_string());
        }
        Ok(nodes)
    }

    pub async fn fetch_edges_by_type(&self, type_name: &str) -> Vec<GraphEdge> {
        let result = self.try_fetch_edges(|t| Ok(t.fetch_edges_by_type(type_name)?)).await;
        self.report("fetch_edges_by_type", result).unwrap_or_default()
    }

    pub async fn fetch_edge(&self, id: &str) -> Option<GraphEdge> {
        let result = self.try_fetch_edges(|t| Ok(t.fetch_edge(id))).await;
        self.report("fetch_edge", result).and_then(|edges| edges.into_iter().next())
    }

    async fn try_fetch_edges<F>(&self, build: F) -> NoteGraphResult<Vec<GraphEdge>>
    where
        F: FnOnce(&QueryTranslator) -> NoteGraphResult<Statement>,
    {
        let statement = self.translator().await.and_then(|t| build(&t));
        let (result, registry) = self.read(statement).await?;
        let mut errors = Vec::new();
        let edges = reload::edges_from_result(&result, registry.edge_schemas(), &mut errors);
        for error in errors {
            self.record("fetch", FailureKind::UnsupportedType, error.to_string());
        }
        Ok(edges)
    }

    async fn translator(&self) -> NoteGraphResult<QueryTranslator> {
        let state = self.state.lock().await;
        state.connection().map(|(_, translator)| translator)
    }
}

/// Apply table changes in order, following a rename for the later ones
async fn alter(
    db: &dyn GraphDatabase,
    translator: &QueryTranslator,
    table: &str,
    changes: &[SchemaChange],
) -> NoteGraphResult<()> {
    let mut table = table.to_string();
    for change in changes {
        db.execute(&translator.alter_table(&table, change)?).await?;
        if let SchemaChange::RenameTable { to, .. } = change {
            table = to.clone();
        }
    }
    Ok(())
}

fn expect_rows(result: NativeResult, message: impl FnOnce() -> String) -> NoteGraphResult<()> {
    if result.is_empty() {
        Err(NoteGraphError::Write(message()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IN_MEMORY;
    use crate::graph::PropertyInstance;
    use crate::schema::{PropertyDefinition, PropertyType};

    async fn store_with_person() -> PropertyGraphStore {
        let store = PropertyGraphStore::embedded(StoreConfig::default());
        assert!(store.create_note_graph(IN_MEMORY).await.is_some());
        let person = NodeSchema::new(
            "Person",
            vec![
                PropertyDefinition::new("name", PropertyType::Text),
                PropertyDefinition::new("age", PropertyType::Number),
            ],
        );
        assert!(store.add_node_schema(person).await);
        store
    }

    #[tokio::test]
    async fn test_operations_without_graph_fail_with_connection_kind() {
        let store = PropertyGraphStore::embedded(StoreConfig::default());
        assert!(!store.add_node(GraphNode::new("Person", vec![])).await);
        let failure = store.last_failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Connection);
        assert_eq!(failure.operation, "add_node");
        assert!(store.execute_query("MATCH (n) RETURN n").await.is_empty());
    }

    #[tokio::test]
    async fn test_add_node_publishes_snapshot() {
        let store = store_with_person().await;
        let mut selected = store.subscribe_selected();
        selected.borrow_and_update();

        let node = GraphNode::new(
            "Person",
            vec![PropertyInstance::new("name", "Alice"), PropertyInstance::new("age", 30i64)],
        );
        assert!(store.add_node(node.clone()).await);
        assert!(selected.has_changed().unwrap());

        let graph = store.selected_note_graph().unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, node.id);
        assert_eq!(graph.nodes[0].property("age"), Some(&crate::value::Value::Integer(30)));
        assert_eq!(graph.node_schemas[0].id, 1);
    }

    #[tokio::test]
    async fn test_failures_are_broadcast() {
        let store = store_with_person().await;
        let mut failures = store.subscribe_failures();

        let bad = GraphNode::new("Person", vec![PropertyInstance::new("age", "thirty")]);
        assert!(!store.add_node(bad).await);

        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.kind, FailureKind::Write);
        assert!(store.selected_note_graph().unwrap().nodes.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_helpers_read_the_engine() {
        let store = store_with_person().await;
        let node = GraphNode::new("Person", vec![PropertyInstance::new("name", "Bob")]);
        assert!(store.add_node(node.clone()).await);

        let by_type = store.fetch_nodes_by_type("Person").await;
        assert_eq!(by_type.len(), 1);
        assert_eq!(store.fetch_node(&node.id).await.map(|n| n.id), Some(node.id));
        assert!(store.fetch_node("missing").await.is_none());
        assert!(store.fetch_nodes_by_type("Nope").await.is_empty());
        assert_eq!(store.last_failure().unwrap().kind, FailureKind::Read);
    }
}
