use notegraph::layout::{compute_layout, LayoutConfig, LayoutGraph, Point};
use notegraph::{
    GraphEdge, GraphNode, GraphVisualState, LayoutManager, NodeSchema, PropertyGraphStore, StoreConfig, IN_MEMORY,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;

fn keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("n{}", i)).collect()
}

#[test]
fn test_pinned_nodes_keep_exact_position() {
    let nodes = keys(6);
    let edges: Vec<(String, String)> = (1..6).map(|i| (nodes[0].clone(), nodes[i].clone())).collect();
    let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));

    let mut pinned = HashMap::new();
    pinned.insert("n0".to_string(), Point::new(123.5, -7.25));
    pinned.insert("n3".to_string(), Point::new(0.0, 0.0));

    for iterations in [0, 1, 100, 250] {
        let config = LayoutConfig {
            iterations,
            ..LayoutConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(iterations as u64);
        let positions = compute_layout(&view, &pinned, &config, &mut rng);
        assert_eq!(positions.len(), 6);
        assert_eq!(positions["n0"], Point::new(123.5, -7.25));
        assert_eq!(positions["n3"], Point::new(0.0, 0.0));
    }
}

#[test]
fn test_connected_pair_settles_at_force_balance() {
    // repulsion / d² = attraction * d per node, so d³ = repulsion / attraction
    let config = LayoutConfig::default();
    let expected = (config.repulsion / config.attraction).cbrt();

    let nodes = keys(2);
    let edges = [(nodes[0].clone(), nodes[1].clone())];
    let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));

    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(seed);
        let positions = compute_layout(&view, &HashMap::new(), &config, &mut rng);
        let distance = positions["n0"].distance(positions["n1"]);
        assert!((distance - expected).abs() < 0.5, "distance {} vs {}", distance, expected);
    }
}

#[test]
fn test_same_seed_same_layout() {
    let nodes = keys(10);
    let edges: Vec<(String, String)> = (1..10).map(|i| (nodes[i - 1].clone(), nodes[i].clone())).collect();
    let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));
    let config = LayoutConfig::default();

    let first = compute_layout(&view, &HashMap::new(), &config, &mut StdRng::seed_from_u64(9));
    let second = compute_layout(&view, &HashMap::new(), &config, &mut StdRng::seed_from_u64(9));
    assert_eq!(first, second);
}

#[test]
fn test_edges_to_unknown_nodes_are_ignored() {
    let nodes = keys(2);
    let ghost = "ghost".to_string();
    let edges = [(nodes[0].clone(), ghost.clone()), (nodes[0].clone(), nodes[1].clone())];
    let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));
    assert_eq!(view.edges.len(), 1);

    let mut rng = StdRng::seed_from_u64(1);
    let positions = compute_layout(&view, &HashMap::new(), &LayoutConfig::default(), &mut rng);
    assert!(!positions.contains_key("ghost"));
}

async fn wait_for<F>(rx: &mut watch::Receiver<GraphVisualState>, done: F) -> GraphVisualState
where
    F: Fn(&GraphVisualState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            {
                let state = rx.borrow_and_update();
                if done(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("layout manager alive");
        }
    })
    .await
    .expect("layout state reached")
}

#[tokio::test]
async fn test_manager_follows_store() {
    let store = PropertyGraphStore::embedded(StoreConfig::default());
    store.create_note_graph(IN_MEMORY).await.unwrap();
    assert!(store.add_node_schema(NodeSchema::new("Note", vec![])).await);
    assert!(store
        .add_edge_schema(notegraph::EdgeSchema::new("LINKS", "Note", "Note", vec![]))
        .await);

    let manager = LayoutManager::with_seed(LayoutConfig::default(), 5);
    let mut states = manager.subscribe();
    let task = manager.follow(store.subscribe_selected());

    let a = GraphNode::new("Note", vec![]);
    let b = GraphNode::new("Note", vec![]);
    assert!(store.add_node(a.clone()).await);
    assert!(store.add_node(b.clone()).await);
    assert!(store.add_edge(GraphEdge::new("LINKS", a.id.clone(), b.id.clone(), vec![])).await);

    let state = wait_for(&mut states, |s| {
        s.nodes.len() == 2 && s.edges.len() == 1 && s.position(&a.id) != s.position(&b.id)
    })
    .await;
    let (edge, from, to) = &state.edges[0];
    assert_eq!(edge.source_node_id, a.id);
    assert_eq!(Some(*from), state.position(&a.id));
    assert_eq!(Some(*to), state.position(&b.id));

    // Dragging pins the node while the rest moves around it
    manager.on_node_drag(&a.id, 250.0, 250.0).unwrap().await.unwrap();
    assert_eq!(manager.state().position(&a.id), Some(Point::new(250.0, 250.0)));

    // Removing the node in the store drops it from the layout
    assert!(store.remove_node(&b.id).await);
    let state = wait_for(&mut states, |s| s.nodes.len() == 1).await;
    assert!(state.edges.is_empty());
    assert!(state.is_pinned(&a.id));

    drop(store);
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("follow task ends with the store")
        .unwrap();
}
