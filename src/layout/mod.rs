//! Graph layout
//!
//! The force computation lives in the `notegraph-layout` crate; this module
//! keeps the visual state of the selected graph and runs that computation
//! off the async runtime.

pub mod manager;

pub use manager::{GraphVisualState, LayoutManager};
pub use notegraph_layout::{compute_layout, compute_layout_from, LayoutConfig, LayoutGraph, Point};
