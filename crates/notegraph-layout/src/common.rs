//! Shared geometry and graph-view types for layout computation
//!
//! Provides a dense, index-based view of the graph so the force loop works
//! on contiguous vectors instead of hash lookups.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A 2-D position or force vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean length of the vector
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: Point) -> f64 {
        (*self - other).length()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Point) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Point {
    type Output = Point;
    fn div(self, rhs: f64) -> Point {
        Point::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Dense view of the nodes and edges taking part in a layout run.
///
/// Node keys are mapped to `0..node_count`; edges are stored as index pairs.
/// Edges naming a key that is not among the nodes are dropped while building
/// the view.
pub struct LayoutGraph<K> {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index back to the caller's key
    pub index_to_node: Vec<K>,
    /// Mapping from key to dense index
    pub node_to_index: HashMap<K, usize>,
    /// Edges as (source index, target index)
    pub edges: Vec<(usize, usize)>,
}

impl<K: Clone + Eq + Hash> LayoutGraph<K> {
    /// Build a view from node keys and (source, target) key pairs.
    ///
    /// Duplicate node keys collapse onto the first occurrence.
    pub fn new<'a, I>(nodes: &[K], edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a K, &'a K)>,
        K: 'a,
    {
        let mut index_to_node = Vec::with_capacity(nodes.len());
        let mut node_to_index = HashMap::with_capacity(nodes.len());

        for key in nodes {
            if !node_to_index.contains_key(key) {
                node_to_index.insert(key.clone(), index_to_node.len());
                index_to_node.push(key.clone());
            }
        }

        let edges = edges
            .into_iter()
            .filter_map(|(source, target)| {
                let s = *node_to_index.get(source)?;
                let t = *node_to_index.get(target)?;
                Some((s, t))
            })
            .collect();

        LayoutGraph {
            node_count: index_to_node.len(),
            index_to_node,
            node_to_index,
            edges,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let a = Point::new(3.0, 4.0);
        let b = Point::new(1.0, 1.0);
        assert_eq!(a.length(), 5.0);
        assert_eq!(a - b, Point::new(2.0, 3.0));
        assert_eq!((a + b) * 2.0, Point::new(8.0, 10.0));
        assert_eq!(a / 2.0, Point::new(1.5, 2.0));
        assert_eq!(-b, Point::new(-1.0, -1.0));
    }

    #[test]
    fn test_layout_graph_drops_dangling_edges() {
        let nodes = vec!["a".to_string(), "b".to_string()];
        let edges = vec![
            ("a".to_string(), "b".to_string()),
            ("a".to_string(), "ghost".to_string()),
        ];
        let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));

        assert_eq!(view.node_count, 2);
        assert_eq!(view.edges, vec![(0, 1)]);
        assert_eq!(view.node_to_index["b"], 1);
    }

    #[test]
    fn test_layout_graph_collapses_duplicate_keys() {
        let nodes = vec![1u64, 2, 1];
        let view = LayoutGraph::new(&nodes, std::iter::empty());
        assert_eq!(view.node_count, 2);
        assert_eq!(view.index_to_node, vec![1, 2]);
    }
}
