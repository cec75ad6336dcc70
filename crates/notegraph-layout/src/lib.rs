pub mod common;
pub mod force;

pub use common::{LayoutGraph, Point};
pub use force::{compute_layout, compute_layout_from, LayoutConfig};
