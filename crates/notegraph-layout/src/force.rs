//! Spring-electrical force-directed layout
//!
//! Every iteration accumulates a pairwise repulsion of `repulsion / d²` and an
//! edge attraction of `attraction * d`, then moves each unpinned node by its
//! accumulated force. Pinned nodes keep their coordinate but still exert and
//! receive forces.

use super::common::{LayoutGraph, Point};
use rand::Rng;
use std::collections::HashMap;
use std::hash::Hash;

/// Force layout configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutConfig {
    /// Number of iterations (fixed, no convergence test)
    pub iterations: usize,
    /// Edge length of the square in which unpinned nodes are seeded
    pub bounds: f64,
    /// Repulsion constant between every pair of nodes
    pub repulsion: f64,
    /// Spring constant along every edge
    pub attraction: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            bounds: 500.0,
            repulsion: 1000.0,
            attraction: 0.1,
        }
    }
}

/// Compute a position for every node.
///
/// Unpinned nodes start at a uniformly random point in
/// `[0, bounds] x [0, bounds]`; pinned nodes start (and stay) at their pinned
/// coordinate. Returns an empty map for an empty node list.
pub fn compute_layout<K, R>(
    view: &LayoutGraph<K>,
    pinned: &HashMap<K, Point>,
    config: &LayoutConfig,
    rng: &mut R,
) -> HashMap<K, Point>
where
    K: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    let start = HashMap::new();
    compute_layout_from(view, pinned, &start, config, rng)
}

/// Like [`compute_layout`], but unpinned nodes found in `start` begin at that
/// position instead of a random one.
pub fn compute_layout_from<K, R>(
    view: &LayoutGraph<K>,
    pinned: &HashMap<K, Point>,
    start: &HashMap<K, Point>,
    config: &LayoutConfig,
    rng: &mut R,
) -> HashMap<K, Point>
where
    K: Clone + Eq + Hash,
    R: Rng + ?Sized,
{
    let n = view.node_count;

    if n == 0 {
        return HashMap::new();
    }

    // 1. Initial placement
    let is_pinned: Vec<bool> = view
        .index_to_node
        .iter()
        .map(|key| pinned.contains_key(key))
        .collect();

    let mut positions: Vec<Point> = view
        .index_to_node
        .iter()
        .map(|key| {
            if let Some(p) = pinned.get(key) {
                *p
            } else if let Some(p) = start.get(key) {
                *p
            } else {
                Point::new(
                    rng.gen_range(0.0..=config.bounds),
                    rng.gen_range(0.0..=config.bounds),
                )
            }
        })
        .collect();

    let mut forces = vec![Point::ZERO; n];

    // 2. Iteration
    for _ in 0..config.iterations {
        forces.iter_mut().for_each(|f| *f = Point::ZERO);

        // Repulsive forces
        for i in 0..n {
            for j in (i + 1)..n {
                let delta = positions[i] - positions[j];
                let distance = delta.length();
                // Coincident nodes exert no force on each other
                if distance > 0.0 {
                    let magnitude = config.repulsion / (distance * distance);
                    let push = (delta / distance) * magnitude;
                    forces[i] += push;
                    forces[j] -= push;
                }
            }
        }

        // Attractive forces
        for &(s, t) in &view.edges {
            if s == t {
                continue;
            }
            let delta = positions[s] - positions[t];
            let distance = delta.length();
            if distance > 0.0 {
                let magnitude = config.attraction * distance;
                let pull = (delta / distance) * magnitude;
                forces[s] -= pull;
                forces[t] += pull;
            }
        }

        // Update positions
        for i in 0..n {
            if !is_pinned[i] {
                positions[i] += forces[i];
            }
        }
    }

    // 3. Map back to keys
    let mut result = HashMap::with_capacity(n);
    for (idx, pos) in positions.into_iter().enumerate() {
        result.insert(view.index_to_node[idx].clone(), pos);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn path_graph(n: u64) -> (Vec<u64>, Vec<(u64, u64)>) {
        let nodes: Vec<u64> = (0..n).collect();
        let edges = (1..n).map(|i| (i - 1, i)).collect();
        (nodes, edges)
    }

    #[test]
    fn test_empty_input() {
        let view: LayoutGraph<u64> = LayoutGraph::new(&[], std::iter::empty());
        let mut rng = StdRng::seed_from_u64(1);
        let result = compute_layout(&view, &HashMap::new(), &LayoutConfig::default(), &mut rng);
        assert!(result.is_empty());
    }

    #[test]
    fn test_every_node_gets_a_position() {
        let (nodes, edges) = path_graph(6);
        let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));
        let mut rng = StdRng::seed_from_u64(7);
        let result = compute_layout(&view, &HashMap::new(), &LayoutConfig::default(), &mut rng);

        assert_eq!(result.len(), 6);
        for p in result.values() {
            assert!(p.x.is_finite() && p.y.is_finite());
        }
    }

    #[test]
    fn test_zero_iterations_keeps_initial_placement_in_bounds() {
        let (nodes, edges) = path_graph(20);
        let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));
        let config = LayoutConfig { iterations: 0, ..LayoutConfig::default() };
        let mut rng = StdRng::seed_from_u64(3);
        let result = compute_layout(&view, &HashMap::new(), &config, &mut rng);

        for p in result.values() {
            assert!((0.0..=500.0).contains(&p.x));
            assert!((0.0..=500.0).contains(&p.y));
        }
    }

    #[test]
    fn test_pinned_node_is_fixed() {
        let (nodes, edges) = path_graph(5);
        let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));
        let mut pinned = HashMap::new();
        pinned.insert(2u64, Point::new(250.0, 125.0));

        let mut rng = StdRng::seed_from_u64(11);
        let result = compute_layout(&view, &pinned, &LayoutConfig::default(), &mut rng);
        assert_eq!(result[&2], Point::new(250.0, 125.0));
    }

    #[test]
    fn test_coincident_nodes_do_not_produce_nan() {
        let nodes = vec![1u64, 2];
        let view = LayoutGraph::new(&nodes, std::iter::empty());
        let mut start = HashMap::new();
        start.insert(1u64, Point::new(10.0, 10.0));
        start.insert(2u64, Point::new(10.0, 10.0));

        let mut rng = StdRng::seed_from_u64(0);
        let result = compute_layout_from(&view, &HashMap::new(), &start, &LayoutConfig::default(), &mut rng);
        assert_eq!(result[&1], Point::new(10.0, 10.0));
        assert_eq!(result[&2], Point::new(10.0, 10.0));
    }

    #[test]
    fn test_two_connected_nodes_attract() {
        let nodes = vec![1u64, 2];
        let edges = vec![(1u64, 2u64)];
        let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));
        let mut start = HashMap::new();
        start.insert(1u64, Point::new(0.0, 0.0));
        start.insert(2u64, Point::new(400.0, 300.0));

        let mut rng = StdRng::seed_from_u64(0);
        let result = compute_layout_from(&view, &HashMap::new(), &start, &LayoutConfig::default(), &mut rng);
        let distance = result[&1].distance(result[&2]);
        assert!(distance < 500.0);
        // Equilibrium of 0.2·d = 2·1000/d² is d = 10000^(1/3) ≈ 21.5
        assert!((distance - 21.544).abs() < 0.5, "distance was {}", distance);
    }

    #[test]
    fn test_unconnected_nodes_repel() {
        let nodes = vec![1u64, 2];
        let view = LayoutGraph::new(&nodes, std::iter::empty());
        let mut start = HashMap::new();
        start.insert(1u64, Point::new(100.0, 100.0));
        start.insert(2u64, Point::new(110.0, 100.0));

        let mut rng = StdRng::seed_from_u64(0);
        let result = compute_layout_from(&view, &HashMap::new(), &start, &LayoutConfig::default(), &mut rng);
        assert!(result[&1].distance(result[&2]) > 10.0);
    }
}
