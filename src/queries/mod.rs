//! Graph queries
//!
//! Read-only analysis over a [`Graph`]. Nothing here mutates state or emits events.

use serde::{Deserialize, Serialize};

use crate::aggregate::Graph;
use crate::components::Node;
use crate::value_objects::NodeId;

/// Graph metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    /// Share of possible directed edges present; zero below two nodes
    pub density: f64,
    /// Mean number of edge ends per node
    pub average_degree: f64,
    pub connected_components: usize,
    pub has_cycles: bool,
}

impl GraphMetrics {
    pub fn from_graph(graph: &Graph) -> Self {
        let nodes = graph.node_count();
        let edges = graph.edge_count();

        let density = if nodes < 2 {
            0.0
        } else {
            edges as f64 / (nodes * (nodes - 1)) as f64
        };
        let average_degree = if nodes == 0 {
            0.0
        } else {
            2.0 * edges as f64 / nodes as f64
        };

        Self {
            node_count: nodes,
            edge_count: edges,
            density,
            average_degree,
            connected_components: graph.connected_components().len(),
            has_cycles: graph.has_cycle(),
        }
    }
}

/// Nodes without incoming edges, in insertion order
pub fn find_source_nodes(graph: &Graph) -> Vec<&Node> {
    graph
        .get_all_nodes()
        .into_iter()
        .filter(|node| graph.get_incoming_edges(node.id).is_empty())
        .collect()
}

/// Nodes without outgoing edges, in insertion order
pub fn find_sink_nodes(graph: &Graph) -> Vec<&Node> {
    graph
        .get_all_nodes()
        .into_iter()
        .filter(|node| graph.get_outgoing_edges(node.id).is_empty())
        .collect()
}

/// Node degree counting both directions
pub fn degree(graph: &Graph, id: NodeId) -> usize {
    graph.get_node_edges(id).len()
}
