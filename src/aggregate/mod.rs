//! Graph aggregates

pub mod graph;

pub use graph::{Graph, GraphSnapshot};
