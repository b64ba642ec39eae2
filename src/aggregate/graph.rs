//! Diagram graph aggregate
//!
//! The graph exclusively owns every node and edge of a document and keeps two derived indices in
//! step with them: an undirected adjacency index and a node-to-incident-edges index. Every
//! operation is total over unknown ids and reports absence through `Option`/`bool`.
//!
//! Note the mixed directedness: adjacency and [`Graph::is_connected`] ignore edge direction,
//! while [`Graph::has_cycle`] and [`Graph::topological_sort`] follow source → target.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::warn;

use crate::components::{Edge, Node};
use crate::factories::{self, EdgeUpdate, NodeUpdate};
use crate::value_objects::{Bounds, EdgeId, NodeId, PortId, Position2D};

/// One level of an iterative depth-first walk over outgoing edges
struct DfsFrame {
    id: NodeId,
    targets: Vec<NodeId>,
    next: usize,
}

/// Serializable form of a graph: just the entities, indices are rebuilt on load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Node and edge storage with adjacency and incidence indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    adjacency: IndexMap<NodeId, IndexSet<NodeId>>,
    node_edges: IndexMap<NodeId, IndexSet<EdgeId>>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    // Mutation

    /// Insert a node, replacing any node with the same id
    pub fn add_node(&mut self, node: Node) {
        let id = node.id;
        self.nodes.insert(id, node);
        self.adjacency.entry(id).or_default();
        self.node_edges.entry(id).or_default();
    }

    /// Remove a node together with every incident edge
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        if !self.nodes.contains_key(&id) {
            return None;
        }

        let incident: Vec<EdgeId> = self
            .node_edges
            .get(&id)
            .map(|edges| edges.iter().copied().collect())
            .unwrap_or_default();
        for edge_id in incident {
            self.remove_edge(edge_id);
        }

        self.adjacency.shift_remove(&id);
        self.node_edges.shift_remove(&id);
        for neighbours in self.adjacency.values_mut() {
            neighbours.shift_remove(&id);
        }

        self.nodes.shift_remove(&id)
    }

    /// Replace a node with a merged copy; the id never changes
    pub fn update_node(&mut self, id: NodeId, update: NodeUpdate) -> Option<Node> {
        let current = self.nodes.get(&id)?;
        let next = factories::update_node(current, update);
        self.nodes.insert(id, next.clone());
        Some(next)
    }

    /// Insert an edge; rejected when either endpoint node is missing
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        let source = edge.source.node_id;
        let target = edge.target.node_id;
        if !self.nodes.contains_key(&source) || !self.nodes.contains_key(&target) {
            return false;
        }

        // an id collision replaces the old edge and its index entries
        if self.edges.contains_key(&edge.id) {
            self.remove_edge(edge.id);
        }

        self.adjacency.entry(source).or_default().insert(target);
        self.adjacency.entry(target).or_default().insert(source);
        self.node_edges.entry(source).or_default().insert(edge.id);
        self.node_edges.entry(target).or_default().insert(edge.id);
        self.edges.insert(edge.id, edge);
        true
    }

    /// Remove an edge and tear down its index entries
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.shift_remove(&id)?;
        let source = edge.source.node_id;
        let target = edge.target.node_id;

        if let Some(edges) = self.node_edges.get_mut(&source) {
            edges.shift_remove(&id);
        }
        if let Some(edges) = self.node_edges.get_mut(&target) {
            edges.shift_remove(&id);
        }

        // two nodes stay adjacent while any other edge still joins them
        if self.find_edge_between(source, target).is_none() {
            if let Some(neighbours) = self.adjacency.get_mut(&source) {
                neighbours.shift_remove(&target);
            }
            if let Some(neighbours) = self.adjacency.get_mut(&target) {
                neighbours.shift_remove(&source);
            }
        }

        Some(edge)
    }

    /// Replace an edge with a merged copy; endpoints and id never change
    pub fn update_edge(&mut self, id: EdgeId, update: EdgeUpdate) -> Option<Edge> {
        let current = self.edges.get(&id)?;
        let next = factories::update_edge(current, update);
        self.edges.insert(id, next.clone());
        Some(next)
    }

    /// Set the `connected` flag of one port; returns the previous value
    pub fn set_port_connected(&mut self, node_id: NodeId, port_id: PortId, connected: bool) -> Option<bool> {
        let node = self.nodes.get(&node_id)?;
        let previous = node.port(port_id)?.connected;
        if previous == connected {
            return Some(previous);
        }

        let ports = node
            .ports
            .iter()
            .map(|port| {
                let mut port = port.clone();
                if port.id == port_id {
                    port.connected = connected;
                }
                port
            })
            .collect();
        self.update_node(node_id, NodeUpdate::ports(ports));
        Some(previous)
    }

    /// Remove every node and edge
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.adjacency.clear();
        self.node_edges.clear();
    }

    // Lookup

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    /// All nodes in insertion order
    pub fn get_all_nodes(&self) -> Vec<&Node> {
        self.nodes.values().collect()
    }

    /// All edges in insertion order
    pub fn get_all_edges(&self) -> Vec<&Edge> {
        self.edges.values().collect()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // Adjacency

    /// Edges touching the node in either direction
    pub fn get_node_edges(&self, id: NodeId) -> Vec<&Edge> {
        self.node_edges
            .get(&id)
            .map(|ids| ids.iter().filter_map(|edge_id| self.edges.get(edge_id)).collect())
            .unwrap_or_default()
    }

    /// Neighbours regardless of edge direction
    pub fn get_connected_nodes(&self, id: NodeId) -> Vec<&Node> {
        self.adjacency
            .get(&id)
            .map(|ids| ids.iter().filter_map(|node_id| self.nodes.get(node_id)).collect())
            .unwrap_or_default()
    }

    pub fn get_outgoing_edges(&self, id: NodeId) -> Vec<&Edge> {
        self.get_node_edges(id)
            .into_iter()
            .filter(|edge| edge.source.node_id == id)
            .collect()
    }

    pub fn get_incoming_edges(&self, id: NodeId) -> Vec<&Edge> {
        self.get_node_edges(id)
            .into_iter()
            .filter(|edge| edge.target.node_id == id)
            .collect()
    }

    pub fn get_successors(&self, id: NodeId) -> Vec<&Node> {
        self.get_outgoing_edges(id)
            .into_iter()
            .filter_map(|edge| self.nodes.get(&edge.target.node_id))
            .collect()
    }

    pub fn get_predecessors(&self, id: NodeId) -> Vec<&Node> {
        self.get_incoming_edges(id)
            .into_iter()
            .filter_map(|edge| self.nodes.get(&edge.source.node_id))
            .collect()
    }

    /// First edge joining the two nodes, preferring `a → b` over `b → a`
    pub fn find_edge_between(&self, a: NodeId, b: NodeId) -> Option<&Edge> {
        let incident = self.get_node_edges(a);
        incident
            .iter()
            .find(|edge| edge.source.node_id == a && edge.target.node_id == b)
            .or_else(|| {
                incident
                    .iter()
                    .find(|edge| edge.source.node_id == b && edge.target.node_id == a)
            })
            .copied()
    }

    // Structure

    /// Whether every node is reachable from every other, ignoring direction
    pub fn is_connected(&self) -> bool {
        let Some(start) = self.nodes.keys().next().copied() else {
            return true;
        };
        self.component_of(start).len() == self.nodes.len()
    }

    /// Undirected connected components, each in BFS order
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut components = Vec::new();
        for id in self.nodes.keys().copied() {
            if seen.contains(&id) {
                continue;
            }
            let component = self.component_of(id);
            seen.extend(component.iter().copied());
            components.push(component);
        }
        components
    }

    fn component_of(&self, start: NodeId) -> Vec<NodeId> {
        let mut visited: HashSet<NodeId> = HashSet::from([start]);
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            order.push(current);
            if let Some(neighbours) = self.adjacency.get(&current) {
                for next in neighbours {
                    if visited.insert(*next) {
                        queue.push_back(*next);
                    }
                }
            }
        }
        order
    }

    /// Whether following edges source → target ever returns to a node on the current path
    pub fn has_cycle(&self) -> bool {
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut on_stack: HashSet<NodeId> = HashSet::new();

        for root in self.nodes.keys().copied() {
            if !visited.insert(root) {
                continue;
            }
            on_stack.insert(root);
            let mut stack = vec![self.frame(root)];

            while let Some(frame) = stack.last_mut() {
                match frame.targets.get(frame.next).copied() {
                    Some(next) => {
                        frame.next += 1;
                        if on_stack.contains(&next) {
                            return true;
                        }
                        if visited.insert(next) {
                            on_stack.insert(next);
                            stack.push(self.frame(next));
                        }
                    }
                    None => {
                        let id = frame.id;
                        stack.pop();
                        on_stack.remove(&id);
                    }
                }
            }
        }
        false
    }

    /// Nodes ordered so every edge's source precedes its target; `None` when cyclic
    pub fn topological_sort(&self) -> Option<Vec<NodeId>> {
        if self.has_cycle() {
            return None;
        }

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut post_order = Vec::with_capacity(self.nodes.len());
        for root in self.nodes.keys().copied() {
            if !visited.insert(root) {
                continue;
            }
            let mut stack = vec![self.frame(root)];

            while let Some(frame) = stack.last_mut() {
                match frame.targets.get(frame.next).copied() {
                    Some(next) => {
                        frame.next += 1;
                        if visited.insert(next) {
                            stack.push(self.frame(next));
                        }
                    }
                    None => {
                        post_order.push(frame.id);
                        stack.pop();
                    }
                }
            }
        }
        post_order.reverse();
        Some(post_order)
    }

    fn frame(&self, id: NodeId) -> DfsFrame {
        DfsFrame {
            id,
            targets: self
                .get_outgoing_edges(id)
                .into_iter()
                .map(|edge| edge.target.node_id)
                .collect(),
            next: 0,
        }
    }

    // Spatial

    /// Bounding box around every node rectangle
    pub fn get_bounds(&self) -> Option<Bounds> {
        self.nodes
            .values()
            .map(factories::node_bounds)
            .reduce(|acc, bounds| acc.union(&bounds))
    }

    /// Nodes whose rectangle intersects `bounds`, edges included
    pub fn get_nodes_in_bounds(&self, bounds: &Bounds) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|node| factories::node_bounds(node).intersects(bounds))
            .collect()
    }

    /// Topmost node under the point; later insertion wins among equal z-indices
    pub fn get_node_at_position(&self, point: &Position2D) -> Option<&Node> {
        let mut hits: Vec<(usize, &Node)> = self
            .nodes
            .values()
            .enumerate()
            .filter(|(_, node)| factories::is_point_in_node(point, node))
            .collect();
        hits.sort_by(|(ia, a), (ib, b)| b.z_index().cmp(&a.z_index()).then(ib.cmp(ia)));
        hits.first().map(|(_, node)| *node)
    }

    // Serialization

    /// Copy the entities out into a serializable snapshot
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    /// Rebuild a graph and its indices; edges with missing endpoints are dropped
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut graph = Graph::new();
        for node in snapshot.nodes {
            graph.add_node(node);
        }
        for edge in snapshot.edges {
            let edge_id = edge.id;
            if !graph.add_edge(edge) {
                warn!(edge_id = %edge_id, "Dropping edge with missing endpoint");
            }
        }
        graph
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.to_snapshot())
    }

    pub fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        let snapshot: GraphSnapshot = serde_json::from_value(value)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Check the derived indices against the node and edge maps
    pub fn indices_consistent(&self) -> bool {
        let keys_match = self.nodes.keys().all(|id| self.adjacency.contains_key(id) && self.node_edges.contains_key(id))
            && self.adjacency.len() == self.nodes.len()
            && self.node_edges.len() == self.nodes.len();
        if !keys_match {
            return false;
        }

        let edges_indexed = self.edges.values().all(|edge| {
            let (s, t) = (edge.source.node_id, edge.target.node_id);
            self.node_edges[&s].contains(&edge.id)
                && self.node_edges[&t].contains(&edge.id)
                && self.adjacency[&s].contains(&t)
                && self.adjacency[&t].contains(&s)
        });
        let no_dangling = self.node_edges.values().flatten().all(|id| self.edges.contains_key(id))
            && self.adjacency.values().flatten().all(|id| self.nodes.contains_key(id));

        edges_indexed && no_dangling
    }
}
