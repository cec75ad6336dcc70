//! Visual state of the selected graph
//!
//! Holds every node with its on-screen position, the edges between known
//! nodes and the set of pinned (dragged) nodes. Layout runs execute on the
//! blocking pool; each run is tagged with a generation and only the newest
//! run may publish its positions.

use crate::graph::{GraphEdge, GraphNode, NoteGraph};
use indexmap::IndexMap;
use notegraph_layout::{compute_layout, LayoutConfig, LayoutGraph, Point};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What a graph view renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphVisualState {
    pub nodes: Vec<(GraphNode, Point)>,
    /// Edges with the current positions of their source and target
    pub edges: Vec<(GraphEdge, Point, Point)>,
    pub pinned: BTreeSet<String>,
}

impl GraphVisualState {
    pub fn position(&self, id: &str) -> Option<Point> {
        self.nodes.iter().find(|(n, _)| n.id == id).map(|(_, p)| *p)
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.pinned.contains(id)
    }
}

#[derive(Default)]
struct Layout {
    nodes: IndexMap<String, GraphNode>,
    edges: IndexMap<String, GraphEdge>,
    /// Nodes that have been placed, by a run or a drag
    positions: HashMap<String, Point>,
    pinned: BTreeSet<String>,
}

impl Layout {
    fn position(&self, id: &str) -> Point {
        self.positions.get(id).copied().unwrap_or_default()
    }

    fn connects_known(&self, edge: &GraphEdge) -> bool {
        self.nodes.contains_key(&edge.source_node_id) && self.nodes.contains_key(&edge.target_node_id)
    }

    fn visual_state(&self) -> GraphVisualState {
        GraphVisualState {
            nodes: self
                .nodes
                .values()
                .map(|n| (n.clone(), self.position(&n.id)))
                .collect(),
            edges: self
                .edges
                .values()
                .map(|e| {
                    (
                        e.clone(),
                        self.position(&e.source_node_id),
                        self.position(&e.target_node_id),
                    )
                })
                .collect(),
            pinned: self.pinned.clone(),
        }
    }
}

struct Shared {
    config: LayoutConfig,
    layout: Mutex<Layout>,
    rng: Mutex<StdRng>,
    generation: AtomicU64,
    state_tx: watch::Sender<GraphVisualState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps the visual state and recomputes positions on structural changes.
///
/// Cloning yields another handle to the same state. Methods that start a
/// layout run must be called from within a tokio runtime.
#[derive(Clone)]
pub struct LayoutManager {
    shared: Arc<Shared>,
}

impl LayoutManager {
    pub fn new(config: LayoutConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Manager whose runs are reproducible for a given sequence of calls
    pub fn with_seed(config: LayoutConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: LayoutConfig, rng: StdRng) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                layout: Mutex::new(Layout::default()),
                rng: Mutex::new(rng),
                generation: AtomicU64::new(0),
                state_tx: watch::Sender::new(GraphVisualState::default()),
            }),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.shared.config
    }

    pub fn subscribe(&self) -> watch::Receiver<GraphVisualState> {
        self.shared.state_tx.subscribe()
    }

    pub fn state(&self) -> GraphVisualState {
        self.shared.state_tx.borrow().clone()
    }

    fn publish(&self, layout: &Layout) {
        self.shared.state_tx.send_replace(layout.visual_state());
    }

    /// Replace the graph, keeping the positions and pins of surviving nodes
    pub fn set_graph(&self, nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) {
        let mut layout = lock(&self.shared.layout);
        layout.nodes = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();

        let Layout {
            nodes,
            positions,
            pinned,
            ..
        } = &mut *layout;
        positions.retain(|id, _| nodes.contains_key(id));
        pinned.retain(|id| nodes.contains_key(id));

        let edges: IndexMap<String, GraphEdge> = edges
            .into_iter()
            .filter(|e| layout.connects_known(e))
            .map(|e| (e.id.clone(), e))
            .collect();
        layout.edges = edges;
        self.publish(&layout);
    }

    pub fn add_node(&self, node: GraphNode) -> JoinHandle<bool> {
        {
            let mut layout = lock(&self.shared.layout);
            layout.nodes.insert(node.id.clone(), node);
            self.publish(&layout);
        }
        self.relayout()
    }

    /// Returns `None` when either endpoint is not part of the layout
    pub fn add_edge(&self, edge: GraphEdge) -> Option<JoinHandle<bool>> {
        {
            let mut layout = lock(&self.shared.layout);
            if !layout.connects_known(&edge) {
                debug!(
                    "Ignoring edge {} with unknown endpoint ({} -> {})",
                    edge.id, edge.source_node_id, edge.target_node_id
                );
                return None;
            }
            layout.edges.insert(edge.id.clone(), edge);
            self.publish(&layout);
        }
        Some(self.relayout())
    }

    /// Replace a node's data in place; its position is untouched
    pub fn update_node(&self, node: GraphNode) -> bool {
        let mut layout = lock(&self.shared.layout);
        match layout.nodes.get_mut(&node.id) {
            Some(existing) => {
                *existing = node;
                self.publish(&layout);
                true
            }
            None => false,
        }
    }

    /// Move a node, pin it there and lay out the rest around it
    pub fn on_node_drag(&self, id: &str, x: f64, y: f64) -> Option<JoinHandle<bool>> {
        {
            let mut layout = lock(&self.shared.layout);
            if !layout.nodes.contains_key(id) {
                return None;
            }
            layout.positions.insert(id.to_string(), Point::new(x, y));
            layout.pinned.insert(id.to_string());
            self.publish(&layout);
        }
        Some(self.relayout())
    }

    /// Release a pinned node. Its position stays until the next run.
    pub fn on_node_drag_end(&self, id: &str) -> bool {
        let mut layout = lock(&self.shared.layout);
        let released = layout.pinned.remove(id);
        if released {
            self.publish(&layout);
        }
        released
    }

    /// Start a layout run over the current nodes and edges.
    ///
    /// The handle resolves to `true` if the run published its positions, or
    /// `false` if a newer run superseded it.
    pub fn relayout(&self) -> JoinHandle<bool> {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (keys, edges, pinned) = {
            let layout = lock(&self.shared.layout);
            let keys: Vec<String> = layout.nodes.keys().cloned().collect();
            let edges: Vec<(String, String)> = layout
                .edges
                .values()
                .map(|e| (e.source_node_id.clone(), e.target_node_id.clone()))
                .collect();
            let pinned: HashMap<String, Point> = layout
                .pinned
                .iter()
                .map(|id| (id.clone(), layout.position(id)))
                .collect();
            (keys, edges, pinned)
        };
        let seed: u64 = lock(&self.shared.rng).gen();

        let manager = self.clone();
        tokio::task::spawn_blocking(move || {
            let view = LayoutGraph::new(&keys, edges.iter().map(|(s, t)| (s, t)));
            let mut rng = StdRng::seed_from_u64(seed);
            let positions = compute_layout(&view, &pinned, &manager.shared.config, &mut rng);
            manager.apply(generation, positions)
        })
    }

    fn apply(&self, generation: u64, positions: HashMap<String, Point>) -> bool {
        let mut layout = lock(&self.shared.layout);
        if self.shared.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding superseded layout run");
            return false;
        }
        for (id, point) in positions {
            if layout.nodes.contains_key(&id) && !layout.pinned.contains(&id) {
                layout.positions.insert(id, point);
            }
        }
        self.publish(&layout);
        true
    }

    /// Mirror a store's selected graph: every snapshot replaces the graph
    /// and triggers a run. Ends when the store is dropped.
    pub fn follow(&self, mut snapshots: watch::Receiver<Option<NoteGraph>>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                let graph = snapshots.borrow_and_update().clone();
                match graph {
                    Some(graph) => {
                        manager.set_graph(graph.nodes, graph.edges);
                        if let Err(e) = manager.relayout().await {
                            warn!("Layout run failed: {}", e);
                        }
                    }
                    None => manager.set_graph(Vec::new(), Vec::new()),
                }
                if snapshots.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
