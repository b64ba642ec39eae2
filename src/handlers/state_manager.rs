//! Document state manager
//!
//! The single authoritative mutator of a diagram document. Every write to nodes, edges,
//! selection, viewport, settings or metadata goes through here. Graph mutations are recorded as
//! [`Command`]s on the [`History`]; every state transition is announced on the [`EventBus`].
//!
//! Undo and redo replay recorded commands straight against the graph without recording anything
//! new, so the redo stack survives the replay.

use chrono::Utc;
use tracing::{debug, warn};

use crate::aggregate::{Graph, GraphSnapshot};
use crate::commands::{
    AddEdgeCommand, AddNodeCommand, Command, DeleteEdgeCommand, DeleteNodeCommand, MoveNodeCommand,
    ResizeNodeCommand, UpdateEdgeStyleCommand, UpdateNodeDataCommand, UpdateNodeStyleCommand,
};
use crate::components::{Edge, EdgeEndpoint, EdgeStyleUpdate, Node, NodeDataUpdate, NodeStyleUpdate};
use crate::config::StateManagerConfig;
use crate::document::{
    Document, DocumentMetadata, Layer, MetadataUpdate, Settings, SettingsUpdate, Viewport,
};
use crate::domain_events::DiagramDomainEvent;
use crate::error::DocumentResult;
use crate::events::{
    DocumentLoaded, DocumentSaved, EdgeAdded, EdgeDeleted, EdgeUpdated, EventBus, HistoryChanged,
    NodeAdded, NodeDeleted, NodeMoved, NodeResized, NodeUpdated, SelectionChanged, ViewportChanged,
};
use crate::factories::{self, EdgeOptions, EdgeUpdate, NodeOptions, NodeUpdate};
use crate::handlers::{History, Selection};
use crate::value_objects::{EdgeId, NodeId, Position2D, Size};

/// Direction in which a command is replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    Undo,
    Redo,
}

/// Owner of one open document's state
#[derive(Debug)]
pub struct StateManager {
    graph: Graph,
    history: History,
    selection: Selection,
    viewport: Viewport,
    settings: Settings,
    metadata: DocumentMetadata,
    layers: Vec<Layer>,
    dirty: bool,
    bus: EventBus,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new(StateManagerConfig::default(), EventBus::new())
    }
}

impl StateManager {
    /// Create a manager holding an empty document
    pub fn new(config: StateManagerConfig, bus: EventBus) -> Self {
        let document = Document::new(config.document_name);
        Self {
            graph: Graph::new(),
            history: History::new(config.undo_limit),
            selection: Selection::None,
            viewport: document.viewport,
            settings: config.settings,
            metadata: document.metadata,
            layers: document.layers,
            dirty: false,
            bus,
        }
    }

    /// The bus this manager publishes on; clone it to subscribe
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    // Read access

    /// Read-only view of the graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.get_node(id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.graph.get_edge(id)
    }

    pub fn nodes(&self) -> Vec<&Node> {
        self.graph.get_all_nodes()
    }

    pub fn edges(&self) -> Vec<&Edge> {
        self.graph.get_all_edges()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Whether the document changed since the last save or load
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // Node operations

    /// Create a node from options and insert it
    pub fn add_node(&mut self, options: NodeOptions) -> Node {
        let node = factories::create_node(options);
        self.insert_node(node)
    }

    fn insert_node(&mut self, node: Node) -> Node {
        self.graph.add_node(node.clone());
        self.emit(DiagramDomainEvent::NodeAdded(NodeAdded { node: node.clone() }));
        self.record(Command::AddNode(AddNodeCommand { node: node.clone() }));
        node
    }

    /// Remove a node and its incident edges as one undo step
    pub fn delete_node(&mut self, id: NodeId) -> Option<Node> {
        if !self.graph.has_node(id) {
            return None;
        }

        let edges: Vec<Edge> = self.graph.get_node_edges(id).into_iter().cloned().collect();
        let node = self.graph.remove_node(id)?;

        for edge in &edges {
            self.prune_edge_selection(edge.id);
            self.emit(DiagramDomainEvent::EdgeDeleted(EdgeDeleted { edge: edge.clone() }));
        }
        self.emit(DiagramDomainEvent::NodeDeleted(NodeDeleted { node: node.clone() }));
        self.prune_node_selection(id);

        self.record(Command::DeleteNode(DeleteNodeCommand {
            node: node.clone(),
            edges,
        }));
        Some(node)
    }

    pub fn move_node(&mut self, id: NodeId, position: Position2D) -> Option<Node> {
        let old_position = self.graph.get_node(id)?.position;
        let node = self.graph.update_node(id, NodeUpdate::position(position))?;

        self.emit(DiagramDomainEvent::NodeMoved(NodeMoved {
            node_id: id,
            old_position,
            new_position: position,
        }));
        self.record(Command::MoveNode(MoveNodeCommand {
            node_id: id,
            old_position,
            new_position: position,
        }));
        Some(node)
    }

    pub fn resize_node(&mut self, id: NodeId, size: Size) -> Option<Node> {
        if !size.is_valid() {
            warn!(node_id = %id, width = size.width, height = size.height, "Rejected invalid node size");
            return None;
        }
        let old_size = self.graph.get_node(id)?.size;
        let node = self.graph.update_node(id, NodeUpdate::size(size))?;

        self.emit(DiagramDomainEvent::NodeResized(NodeResized {
            node_id: id,
            old_size,
            new_size: size,
        }));
        self.record(Command::ResizeNode(ResizeNodeCommand {
            node_id: id,
            old_size,
            new_size: size,
        }));
        Some(node)
    }

    pub fn update_node_data(&mut self, id: NodeId, update: NodeDataUpdate) -> Option<Node> {
        let previous = self.graph.get_node(id)?.clone();
        let new_data = previous.data.merged(&update);
        let node = self.graph.update_node(id, NodeUpdate::data(new_data.clone()))?;

        self.emit(DiagramDomainEvent::NodeUpdated(NodeUpdated {
            previous: previous.clone(),
            node: node.clone(),
        }));
        self.record(Command::UpdateNodeData(UpdateNodeDataCommand {
            node_id: id,
            old_data: previous.data,
            new_data,
        }));
        Some(node)
    }

    pub fn update_node_style(&mut self, id: NodeId, update: NodeStyleUpdate) -> Option<Node> {
        let previous = self.graph.get_node(id)?.clone();
        let new_style = previous.style.merged(&update);
        let node = self.graph.update_node(id, NodeUpdate::style(new_style.clone()))?;

        self.emit(DiagramDomainEvent::NodeUpdated(NodeUpdated {
            previous: previous.clone(),
            node: node.clone(),
        }));
        self.record(Command::UpdateNodeStyle(UpdateNodeStyleCommand {
            node_id: id,
            old_style: previous.style,
            new_style,
        }));
        Some(node)
    }

    // Edge operations

    /// Connect two ports; `None` without side effects when the request is invalid
    ///
    /// Rejected: self loops, unknown endpoint nodes, and ports that do not belong to their node.
    pub fn add_edge(&mut self, options: EdgeOptions) -> Option<Edge> {
        self.connect(factories::create_edge(options))
    }

    fn connect(&mut self, edge: Edge) -> Option<Edge> {
        let (source, target) = (edge.source, edge.target);
        if edge.is_self_loop() {
            warn!(node_id = %source.node_id, "Rejected self-loop edge");
            return None;
        }
        let (Some(source_was), Some(target_was)) = (self.port_state(source), self.port_state(target)) else {
            warn!(
                source_node = %source.node_id,
                target_node = %target.node_id,
                "Rejected edge with missing endpoint"
            );
            return None;
        };

        if !self.graph.add_edge(edge.clone()) {
            return None;
        }
        self.graph.set_port_connected(source.node_id, source.port_id, true);
        self.graph.set_port_connected(target.node_id, target.port_id, true);

        self.emit(DiagramDomainEvent::EdgeAdded(EdgeAdded { edge: edge.clone() }));
        self.record(Command::AddEdge(AddEdgeCommand {
            edge: edge.clone(),
            source_port_was_connected: source_was,
            target_port_was_connected: target_was,
        }));
        Some(edge)
    }

    fn port_state(&self, endpoint: EdgeEndpoint) -> Option<bool> {
        self.graph
            .get_node(endpoint.node_id)?
            .port(endpoint.port_id)
            .map(|port| port.connected)
    }

    pub fn delete_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.graph.remove_edge(id)?;
        self.emit(DiagramDomainEvent::EdgeDeleted(EdgeDeleted { edge: edge.clone() }));
        self.prune_edge_selection(id);
        self.record(Command::DeleteEdge(DeleteEdgeCommand { edge: edge.clone() }));
        Some(edge)
    }

    pub fn update_edge_style(&mut self, id: EdgeId, update: EdgeStyleUpdate) -> Option<Edge> {
        let previous = self.graph.get_edge(id)?.clone();
        let new_style = previous.style.merged(&update);
        let edge = self.graph.update_edge(id, EdgeUpdate::style(new_style.clone()))?;

        self.emit(DiagramDomainEvent::EdgeUpdated(EdgeUpdated {
            previous: previous.clone(),
            edge: edge.clone(),
        }));
        self.record(Command::UpdateEdgeStyle(UpdateEdgeStyleCommand {
            edge_id: id,
            old_style: previous.style,
            new_style,
        }));
        Some(edge)
    }

    // Compound operations

    /// Delete everything selected as one undo step; returns how many entities were removed
    pub fn delete_selection(&mut self) -> usize {
        let selection = self.selection.clone();
        self.begin_batch();
        let removed = match &selection {
            Selection::None => 0,
            Selection::Node(ids) => ids.iter().filter_map(|id| self.delete_node(*id)).count(),
            Selection::Edge(ids) => ids.iter().filter_map(|id| self.delete_edge(*id)).count(),
        };
        self.end_batch(format!("Delete {removed} item(s)"));
        removed
    }

    /// Copy nodes, and the edges running between them, as one undo step
    ///
    /// The copies become the new node selection.
    pub fn duplicate_nodes(&mut self, ids: &[NodeId]) -> Vec<Node> {
        let originals: Vec<Node> = ids
            .iter()
            .filter_map(|id| self.graph.get_node(*id).cloned())
            .collect();
        if originals.is_empty() {
            return Vec::new();
        }

        let inner_edges: Vec<Edge> = self
            .graph
            .get_all_edges()
            .into_iter()
            .filter(|edge| {
                originals.iter().any(|n| n.id == edge.source.node_id)
                    && originals.iter().any(|n| n.id == edge.target.node_id)
            })
            .cloned()
            .collect();

        self.begin_batch();
        let copies: Vec<Node> = originals
            .iter()
            .map(|original| self.insert_node(factories::clone_node(original, None)))
            .collect();

        let remap = |endpoint: &EdgeEndpoint| -> Option<EdgeEndpoint> {
            let index = originals.iter().position(|n| n.id == endpoint.node_id)?;
            let port_index = originals[index].ports.iter().position(|p| p.id == endpoint.port_id)?;
            let copy = &copies[index];
            Some(EdgeEndpoint::new(copy.id, copy.ports.get(port_index)?.id))
        };
        let edge_copies: Vec<Edge> = inner_edges
            .iter()
            .filter_map(|edge| {
                Some(Edge {
                    source: remap(&edge.source)?,
                    target: remap(&edge.target)?,
                    ..factories::clone_edge(edge)
                })
            })
            .collect();
        for edge in edge_copies {
            self.connect(edge);
        }
        self.end_batch(format!("Duplicate {} node(s)", copies.len()));

        self.set_selection(Selection::nodes(copies.iter().map(|n| n.id)));
        copies
            .iter()
            .filter_map(|copy| self.graph.get_node(copy.id).cloned())
            .collect()
    }

    // Batching

    /// Collect subsequent mutations into a single undo step
    pub fn begin_batch(&mut self) {
        self.history.begin_batch();
    }

    /// Close the batch opened by [`StateManager::begin_batch`]
    pub fn end_batch(&mut self, description: impl Into<String>) -> bool {
        let pushed = self.history.end_batch(description);
        if pushed {
            self.emit_history_changed();
        }
        pushed
    }

    pub fn is_batching(&self) -> bool {
        self.history.is_batching()
    }

    // History

    /// Revert the most recent command; false when there is nothing to undo
    ///
    /// Refused while a batch is open, since the batch's commands are not on the stack yet.
    pub fn undo(&mut self) -> bool {
        if self.history.is_batching() {
            warn!("Undo requested while a batch is open");
            return false;
        }
        let Some(command) = self.history.pop_undo() else {
            return false;
        };

        debug!(command = %command.kind(), description = %command.description(), "Undo");
        self.replay(&command, Replay::Undo);
        self.history.push_redo(command);
        self.dirty = true;
        self.emit_history_changed();
        true
    }

    /// Reapply the most recently undone command; false when there is nothing to redo
    pub fn redo(&mut self) -> bool {
        if self.history.is_batching() {
            warn!("Redo requested while a batch is open");
            return false;
        }
        let Some(command) = self.history.pop_redo() else {
            return false;
        };

        debug!(command = %command.kind(), description = %command.description(), "Redo");
        self.replay(&command, Replay::Redo);
        self.history.push_undo(command);
        self.dirty = true;
        self.emit_history_changed();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_count(&self) -> usize {
        self.history.undo_len()
    }

    pub fn redo_count(&self) -> usize {
        self.history.redo_len()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.history.peek_undo().map(Command::description)
    }

    pub fn redo_description(&self) -> Option<String> {
        self.history.peek_redo().map(Command::description)
    }

    /// Read-only access to the recorded commands
    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn set_undo_limit(&mut self, limit: usize) {
        self.history.set_limit(limit);
        self.emit_history_changed();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.emit_history_changed();
    }

    fn replay(&mut self, command: &Command, direction: Replay) {
        match command {
            Command::AddNode(c) => match direction {
                Replay::Undo => self.replay_remove_node(c.node.id),
                Replay::Redo => self.replay_insert_node(&c.node, &[]),
            },
            Command::DeleteNode(c) => match direction {
                Replay::Undo => self.replay_insert_node(&c.node, &c.edges),
                Replay::Redo => self.replay_remove_node(c.node.id),
            },
            Command::MoveNode(c) => {
                let (from, to) = match direction {
                    Replay::Undo => (c.new_position, c.old_position),
                    Replay::Redo => (c.old_position, c.new_position),
                };
                if self.graph.update_node(c.node_id, NodeUpdate::position(to)).is_some() {
                    self.emit(DiagramDomainEvent::NodeMoved(NodeMoved {
                        node_id: c.node_id,
                        old_position: from,
                        new_position: to,
                    }));
                }
            }
            Command::ResizeNode(c) => {
                let (from, to) = match direction {
                    Replay::Undo => (c.new_size, c.old_size),
                    Replay::Redo => (c.old_size, c.new_size),
                };
                if self.graph.update_node(c.node_id, NodeUpdate::size(to)).is_some() {
                    self.emit(DiagramDomainEvent::NodeResized(NodeResized {
                        node_id: c.node_id,
                        old_size: from,
                        new_size: to,
                    }));
                }
            }
            Command::UpdateNodeData(c) => {
                let data = match direction {
                    Replay::Undo => &c.old_data,
                    Replay::Redo => &c.new_data,
                };
                self.replay_node_update(c.node_id, NodeUpdate::data(data.clone()));
            }
            Command::UpdateNodeStyle(c) => {
                let style = match direction {
                    Replay::Undo => &c.old_style,
                    Replay::Redo => &c.new_style,
                };
                self.replay_node_update(c.node_id, NodeUpdate::style(style.clone()));
            }
            Command::AddEdge(c) => match direction {
                Replay::Undo => {
                    self.replay_remove_edge(c.edge.id);
                    let source = c.edge.source;
                    let target = c.edge.target;
                    self.graph
                        .set_port_connected(source.node_id, source.port_id, c.source_port_was_connected);
                    self.graph
                        .set_port_connected(target.node_id, target.port_id, c.target_port_was_connected);
                }
                Replay::Redo => {
                    if self.replay_insert_edge(&c.edge) {
                        let source = c.edge.source;
                        let target = c.edge.target;
                        self.graph.set_port_connected(source.node_id, source.port_id, true);
                        self.graph.set_port_connected(target.node_id, target.port_id, true);
                    }
                }
            },
            Command::DeleteEdge(c) => match direction {
                Replay::Undo => {
                    self.replay_insert_edge(&c.edge);
                }
                Replay::Redo => self.replay_remove_edge(c.edge.id),
            },
            Command::UpdateEdgeStyle(c) => {
                let style = match direction {
                    Replay::Undo => &c.old_style,
                    Replay::Redo => &c.new_style,
                };
                let Some(previous) = self.graph.get_edge(c.edge_id).cloned() else {
                    return;
                };
                if let Some(edge) = self.graph.update_edge(c.edge_id, EdgeUpdate::style(style.clone())) {
                    self.emit(DiagramDomainEvent::EdgeUpdated(EdgeUpdated { previous, edge }));
                }
            }
            Command::Batch(batch) => match direction {
                Replay::Undo => {
                    for sub in batch.commands.iter().rev() {
                        self.replay(sub, direction);
                    }
                }
                Replay::Redo => {
                    for sub in &batch.commands {
                        self.replay(sub, direction);
                    }
                }
            },
        }
    }

    fn replay_insert_node(&mut self, node: &Node, edges: &[Edge]) {
        self.graph.add_node(node.clone());
        self.emit(DiagramDomainEvent::NodeAdded(NodeAdded { node: node.clone() }));
        for edge in edges {
            self.replay_insert_edge(edge);
        }
    }

    fn replay_remove_node(&mut self, id: NodeId) {
        let edges: Vec<Edge> = self.graph.get_node_edges(id).into_iter().cloned().collect();
        let Some(node) = self.graph.remove_node(id) else {
            warn!(node_id = %id, "Replay skipped missing node");
            return;
        };
        for edge in edges {
            self.prune_edge_selection(edge.id);
            self.emit(DiagramDomainEvent::EdgeDeleted(EdgeDeleted { edge }));
        }
        self.emit(DiagramDomainEvent::NodeDeleted(NodeDeleted { node }));
        self.prune_node_selection(id);
    }

    fn replay_insert_edge(&mut self, edge: &Edge) -> bool {
        if !self.graph.add_edge(edge.clone()) {
            warn!(edge_id = %edge.id, "Replay skipped edge with missing endpoint");
            return false;
        }
        self.emit(DiagramDomainEvent::EdgeAdded(EdgeAdded { edge: edge.clone() }));
        true
    }

    fn replay_remove_edge(&mut self, id: EdgeId) {
        if let Some(edge) = self.graph.remove_edge(id) {
            self.emit(DiagramDomainEvent::EdgeDeleted(EdgeDeleted { edge }));
            self.prune_edge_selection(id);
        }
    }

    fn replay_node_update(&mut self, id: NodeId, update: NodeUpdate) {
        let Some(previous) = self.graph.get_node(id).cloned() else {
            return;
        };
        if let Some(node) = self.graph.update_node(id, update) {
            self.emit(DiagramDomainEvent::NodeUpdated(NodeUpdated { previous, node }));
        }
    }

    // Selection

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the selection; ids that no longer exist are dropped
    pub fn set_selection(&mut self, selection: Selection) {
        let selection = match selection {
            Selection::None => Selection::None,
            Selection::Node(ids) => Selection::nodes(ids.into_iter().filter(|id| self.graph.has_node(*id))),
            Selection::Edge(ids) => Selection::edges(ids.into_iter().filter(|id| self.graph.has_edge(*id))),
        };
        self.replace_selection(selection);
    }

    pub fn clear_selection(&mut self) {
        self.replace_selection(Selection::None);
    }

    pub fn select_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        self.set_selection(Selection::nodes(ids));
    }

    pub fn select_edges(&mut self, ids: impl IntoIterator<Item = EdgeId>) {
        self.set_selection(Selection::edges(ids));
    }

    /// Select every node
    pub fn select_all(&mut self) {
        let ids: Vec<NodeId> = self.graph.node_ids().collect();
        self.set_selection(Selection::nodes(ids));
    }

    pub fn selected_nodes(&self) -> Vec<&Node> {
        self.selection
            .node_ids()
            .iter()
            .filter_map(|id| self.graph.get_node(*id))
            .collect()
    }

    pub fn selected_edges(&self) -> Vec<&Edge> {
        self.selection
            .edge_ids()
            .iter()
            .filter_map(|id| self.graph.get_edge(*id))
            .collect()
    }

    pub fn is_node_selected(&self, id: NodeId) -> bool {
        self.selection.contains_node(id)
    }

    pub fn is_edge_selected(&self, id: EdgeId) -> bool {
        self.selection.contains_edge(id)
    }

    fn replace_selection(&mut self, selection: Selection) {
        if selection == self.selection {
            return;
        }
        let previous = std::mem::replace(&mut self.selection, selection);
        self.emit(DiagramDomainEvent::SelectionChanged(SelectionChanged {
            previous,
            current: self.selection.clone(),
        }));
    }

    fn prune_node_selection(&mut self, id: NodeId) {
        if let Some(next) = self.selection.without_node(id) {
            self.replace_selection(next);
        }
    }

    fn prune_edge_selection(&mut self, id: EdgeId) {
        if let Some(next) = self.selection.without_edge(id) {
            self.replace_selection(next);
        }
    }

    // Viewport, settings, metadata

    /// Replace the viewport; the scale is clamped into the supported zoom range
    pub fn set_viewport(&mut self, viewport: Viewport) {
        let viewport = viewport.clamped();
        if viewport == self.viewport {
            return;
        }
        let previous = std::mem::replace(&mut self.viewport, viewport);
        self.emit(DiagramDomainEvent::ViewportChanged(ViewportChanged {
            previous,
            current: viewport,
        }));
    }

    pub fn update_settings(&mut self, update: SettingsUpdate) -> &Settings {
        let next = self.settings.merged(&update);
        if next != self.settings {
            self.settings = next;
            self.dirty = true;
        }
        &self.settings
    }

    pub fn update_metadata(&mut self, update: MetadataUpdate) -> &DocumentMetadata {
        if let Some(name) = update.name {
            self.metadata.name = name;
        }
        if let Some(description) = update.description {
            self.metadata.description = description;
        }
        if let Some(author) = update.author {
            self.metadata.author = author;
        }
        if let Some(tags) = update.tags {
            self.metadata.tags = tags;
        }
        self.metadata.updated_at = Utc::now();
        self.dirty = true;
        &self.metadata
    }

    // Documents

    /// Replace all state with the document's; history and selection are cleared
    pub fn load_document(&mut self, document: Document) {
        let Document {
            metadata,
            nodes,
            edges,
            layers,
            viewport,
            settings,
        } = document;

        self.graph = Graph::from_snapshot(GraphSnapshot { nodes, edges });
        self.metadata = metadata;
        self.layers = layers;
        self.viewport = viewport;
        self.settings = settings;
        self.selection = Selection::None;
        self.history.clear();
        self.dirty = false;

        debug!(
            document_id = %self.metadata.id,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "Document loaded"
        );
        self.emit(DiagramDomainEvent::DocumentLoaded(DocumentLoaded {
            metadata: self.metadata.clone(),
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
        }));
        self.emit_history_changed();
    }

    /// Snapshot the current state as a document and clear the dirty flag
    pub fn save_document(&mut self) -> Document {
        self.metadata.updated_at = Utc::now();
        let GraphSnapshot { nodes, edges } = self.graph.to_snapshot();
        let document = Document {
            metadata: self.metadata.clone(),
            nodes,
            edges,
            layers: self.layers.clone(),
            viewport: self.viewport,
            settings: self.settings.clone(),
        };
        self.dirty = false;

        self.emit(DiagramDomainEvent::DocumentSaved(DocumentSaved {
            metadata: self.metadata.clone(),
        }));
        document
    }

    /// Parse, validate and load a JSON document
    pub fn load_document_json(&mut self, json: &str) -> DocumentResult<()> {
        let document = Document::from_json(json)?;
        self.load_document(document);
        Ok(())
    }

    /// Save the current state as a JSON document
    pub fn save_document_json(&mut self) -> DocumentResult<String> {
        self.save_document().to_json()
    }

    // Plumbing

    fn record(&mut self, command: Command) {
        debug!(command = %command.kind(), batching = self.history.is_batching(), "Applied command");
        self.dirty = true;
        if self.history.record(command) {
            self.emit_history_changed();
        }
    }

    fn emit_history_changed(&self) {
        self.emit(DiagramDomainEvent::HistoryChanged(HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            undo_count: self.history.undo_len(),
            redo_count: self.history.redo_len(),
        }));
    }

    fn emit(&self, event: DiagramDomainEvent) {
        self.bus.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::NodeType;
    use crate::domain_events::EventType;
    use crate::value_objects::Color;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     SM[StateManager] --> N[Node ops]
    ///     SM --> E[Edge ops]
    ///     SM --> H[Undo / redo / batch]
    ///     SM --> S[Selection]
    ///     SM --> D[Save / load]
    ///     SM --> EV[Events]
    /// ```

    fn manager() -> StateManager {
        StateManager::default()
    }

    fn record_events(manager: &StateManager) -> Rc<RefCell<Vec<EventType>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = manager
            .event_bus()
            .on_all(move |event| sink.borrow_mut().push(event.event_type()));
        log
    }

    fn rect(manager: &mut StateManager, x: f64, y: f64) -> Node {
        manager.add_node(NodeOptions::new(NodeType::Rectangle, Position2D::new(x, y)))
    }

    fn link(manager: &mut StateManager, a: &Node, b: &Node) -> Option<Edge> {
        manager.add_edge(EdgeOptions::new(a.id, a.ports[1].id, b.id, b.ports[3].id))
    }

    #[test]
    fn test_move_and_undo_scenario() {
        let mut sm = manager();
        let n1 = rect(&mut sm, 0.0, 0.0);
        assert_eq!(sm.nodes().len(), 1);

        sm.move_node(n1.id, Position2D::new(50.0, 50.0)).unwrap();
        assert_eq!(sm.node(n1.id).unwrap().position, Position2D::new(50.0, 50.0));

        assert!(sm.undo());
        assert_eq!(sm.node(n1.id).unwrap().position, Position2D::new(0.0, 0.0));
        assert!(sm.undo());
        assert!(sm.nodes().is_empty());
        assert!(!sm.undo());

        assert!(sm.redo());
        assert!(sm.redo());
        assert_eq!(sm.node(n1.id).unwrap().position, Position2D::new(50.0, 50.0));
        assert!(!sm.redo());
    }

    #[test]
    fn test_operations_on_missing_ids_are_noops() {
        let mut sm = manager();
        let ghost = NodeId::new();

        assert!(sm.delete_node(ghost).is_none());
        assert!(sm.move_node(ghost, Position2D::default()).is_none());
        assert!(sm.resize_node(ghost, Size::default()).is_none());
        assert!(sm.update_node_data(ghost, NodeDataUpdate::default()).is_none());
        assert!(sm.update_node_style(ghost, NodeStyleUpdate::default()).is_none());
        assert!(sm.delete_edge(EdgeId::new()).is_none());
        assert!(sm.update_edge_style(EdgeId::new(), EdgeStyleUpdate::default()).is_none());

        assert!(!sm.can_undo());
        assert!(!sm.is_dirty());
    }

    #[test]
    fn test_delete_node_twice() {
        let mut sm = manager();
        let n1 = rect(&mut sm, 0.0, 0.0);

        assert!(sm.delete_node(n1.id).is_some());
        let depth = sm.undo_count();
        assert!(sm.delete_node(n1.id).is_none());
        assert_eq!(sm.undo_count(), depth);
    }

    #[test]
    fn test_add_edge_marks_ports_and_undo_restores_them() {
        let mut sm = manager();
        let a = rect(&mut sm, 0.0, 0.0);
        let b = rect(&mut sm, 200.0, 0.0);

        let edge = link(&mut sm, &a, &b).unwrap();
        assert!(sm.node(a.id).unwrap().port(edge.source.port_id).unwrap().connected);
        assert!(sm.node(b.id).unwrap().port(edge.target.port_id).unwrap().connected);

        assert!(sm.undo());
        assert!(sm.edges().is_empty());
        assert!(!sm.node(a.id).unwrap().port(edge.source.port_id).unwrap().connected);
        assert!(!sm.node(b.id).unwrap().port(edge.target.port_id).unwrap().connected);

        assert!(sm.redo());
        assert!(sm.edge(edge.id).is_some());
        assert!(sm.node(a.id).unwrap().port(edge.source.port_id).unwrap().connected);
    }

    #[test]
    fn test_add_edge_rejections_leave_no_trace() {
        let mut sm = manager();
        let a = rect(&mut sm, 0.0, 0.0);
        let b = rect(&mut sm, 200.0, 0.0);
        let depth = sm.undo_count();

        // self loop
        assert!(sm
            .add_edge(EdgeOptions::new(a.id, a.ports[0].id, a.id, a.ports[2].id))
            .is_none());
        // missing target node
        assert!(sm
            .add_edge(EdgeOptions::new(a.id, a.ports[0].id, NodeId::new(), b.ports[0].id))
            .is_none());
        // port that belongs to another node
        assert!(sm
            .add_edge(EdgeOptions::new(a.id, b.ports[0].id, b.id, b.ports[1].id))
            .is_none());

        assert!(sm.edges().is_empty());
        assert_eq!(sm.undo_count(), depth);
        assert!(sm.node(a.id).unwrap().ports.iter().all(|p| !p.connected));
    }

    #[test]
    fn test_delete_node_restores_edges_on_undo() {
        let mut sm = manager();
        let a = rect(&mut sm, 0.0, 0.0);
        let b = rect(&mut sm, 200.0, 0.0);
        let c = rect(&mut sm, 400.0, 0.0);
        let ab = link(&mut sm, &a, &b).unwrap();
        let bc = link(&mut sm, &b, &c).unwrap();

        let events = record_events(&sm);
        sm.delete_node(b.id).unwrap();
        assert!(sm.edges().is_empty());
        assert_eq!(
            *events.borrow(),
            vec![
                EventType::EdgeDeleted,
                EventType::EdgeDeleted,
                EventType::NodeDeleted,
                EventType::HistoryChanged
            ]
        );

        assert!(sm.undo());
        assert!(sm.node(b.id).is_some());
        assert!(sm.edge(ab.id).is_some());
        assert!(sm.edge(bc.id).is_some());
        assert!(sm.graph().indices_consistent());
    }

    #[test]
    fn test_update_data_and_style_round_trip() {
        let mut sm = manager();
        let n = rect(&mut sm, 0.0, 0.0);

        sm.update_node_data(
            n.id,
            NodeDataUpdate {
                label: Some("Review".to_string()),
                ..Default::default()
            },
        );
        sm.update_node_style(
            n.id,
            NodeStyleUpdate {
                fill_color: Some(Color::BLACK),
                ..Default::default()
            },
        );
        assert_eq!(sm.node(n.id).unwrap().data.label, "Review");
        assert_eq!(sm.node(n.id).unwrap().style.fill_color, Color::BLACK);

        sm.undo();
        assert_eq!(sm.node(n.id).unwrap().style.fill_color, Color::WHITE);
        assert_eq!(sm.node(n.id).unwrap().data.label, "Review");
        sm.undo();
        assert_eq!(sm.node(n.id).unwrap().data.label, "");
        sm.redo();
        assert_eq!(sm.node(n.id).unwrap().data.label, "Review");
    }

    #[test]
    fn test_resize_and_edge_style() {
        let mut sm = manager();
        let a = rect(&mut sm, 0.0, 0.0);
        let b = rect(&mut sm, 200.0, 0.0);
        let edge = link(&mut sm, &a, &b).unwrap();

        let size = Size::new(300.0, 150.0).unwrap();
        sm.resize_node(a.id, size);
        sm.update_edge_style(
            edge.id,
            EdgeStyleUpdate {
                animated: Some(true),
                ..Default::default()
            },
        );
        assert!(sm.edge(edge.id).unwrap().style.animated);

        sm.undo();
        assert!(!sm.edge(edge.id).unwrap().style.animated);
        sm.undo();
        assert_eq!(sm.node(a.id).unwrap().size, a.size);
        sm.redo();
        assert_eq!(sm.node(a.id).unwrap().size, size);
    }

    #[test]
    fn test_resize_rejects_invalid_size() {
        let mut sm = manager();
        let a = rect(&mut sm, 0.0, 0.0);
        let depth = sm.undo_count();

        for size in [
            Size { width: -5.0, height: 10.0 },
            Size { width: 10.0, height: 0.0 },
            Size { width: f64::NAN, height: 10.0 },
        ] {
            assert!(sm.resize_node(a.id, size).is_none());
        }
        assert_eq!(sm.undo_count(), depth);
        assert_eq!(sm.node(a.id).unwrap().size, a.size);
    }

    #[test]
    fn test_new_mutation_clears_redo() {
        let mut sm = manager();
        let n = rect(&mut sm, 0.0, 0.0);
        sm.move_node(n.id, Position2D::new(1.0, 1.0));
        sm.undo();
        assert!(sm.can_redo());

        sm.move_node(n.id, Position2D::new(2.0, 2.0));
        assert!(!sm.can_redo());
        assert!(!sm.redo());
    }

    #[test]
    fn test_batch_is_one_undo_step() {
        let mut sm = manager();
        sm.begin_batch();
        let a = rect(&mut sm, 0.0, 0.0);
        let b = rect(&mut sm, 100.0, 0.0);
        assert!(!sm.undo());
        assert!(sm.end_batch("Add two"));

        assert_eq!(sm.undo_count(), 1);
        assert_eq!(sm.undo_description().as_deref(), Some("Add two"));

        assert!(sm.undo());
        assert!(sm.nodes().is_empty());
        assert_eq!(sm.redo_description().as_deref(), Some("Add two"));
        assert!(sm.redo());
        assert!(sm.node(a.id).is_some());
        assert!(sm.node(b.id).is_some());
    }

    #[test]
    fn test_empty_and_single_batches() {
        let mut sm = manager();
        sm.begin_batch();
        assert!(!sm.end_batch("nothing"));
        assert!(!sm.can_undo());

        sm.begin_batch();
        rect(&mut sm, 0.0, 0.0);
        assert!(sm.end_batch("one"));
        assert_eq!(sm.undo_description().as_deref(), Some("Add node"));
    }

    #[test]
    fn test_undo_limit() {
        let mut sm = StateManager::new(StateManagerConfig::default().with_undo_limit(3), EventBus::new());
        let n = rect(&mut sm, 0.0, 0.0);
        for i in 1..=4 {
            sm.move_node(n.id, Position2D::new(i as f64, 0.0));
        }
        assert_eq!(sm.undo_count(), 3);

        while sm.undo() {}
        // the node creation and the first move fell off the stack
        assert_eq!(sm.node(n.id).unwrap().position, Position2D::new(1.0, 0.0));
    }

    #[test]
    fn test_dirty_flag() {
        let mut sm = manager();
        assert!(!sm.is_dirty());
        let n = rect(&mut sm, 0.0, 0.0);
        assert!(sm.is_dirty());

        sm.save_document();
        assert!(!sm.is_dirty());

        sm.select_nodes([n.id]);
        sm.set_viewport(Viewport::new(10.0, 10.0, 2.0));
        assert!(!sm.is_dirty());

        sm.undo();
        assert!(sm.is_dirty());
        sm.load_document(Document::new("Fresh"));
        assert!(!sm.is_dirty());
    }

    #[test]
    fn test_selection_is_pruned_and_not_undoable() {
        let mut sm = manager();
        let a = rect(&mut sm, 0.0, 0.0);
        let b = rect(&mut sm, 100.0, 0.0);
        let depth = sm.undo_count();

        sm.select_nodes([a.id, b.id, NodeId::new()]);
        assert_eq!(sm.selection().len(), 2);
        assert_eq!(sm.undo_count(), depth);

        sm.delete_node(a.id);
        assert_eq!(sm.selection(), &Selection::nodes([b.id]));

        let edge_selection = Selection::edges([EdgeId::new()]);
        sm.set_selection(edge_selection);
        assert!(sm.selection().is_empty());
    }

    #[test]
    fn test_selection_events_carry_old_and_new() {
        let mut sm = manager();
        let a = rect(&mut sm, 0.0, 0.0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = sm.event_bus().on(EventType::SelectionChanged, move |event| {
            if let DiagramDomainEvent::SelectionChanged(change) = event {
                sink.borrow_mut().push(change.clone());
            }
        });

        sm.select_all();
        sm.select_all();
        sm.clear_selection();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].previous, Selection::None);
        assert_eq!(seen[0].current, Selection::nodes([a.id]));
        assert_eq!(seen[1].current, Selection::None);
    }

    #[test]
    fn test_delete_selection_is_atomic() {
        let mut sm = manager();
        let a = rect(&mut sm, 0.0, 0.0);
        let b = rect(&mut sm, 100.0, 0.0);
        let c = rect(&mut sm, 200.0, 0.0);
        link(&mut sm, &a, &c).unwrap();

        sm.select_nodes([a.id, b.id]);
        assert_eq!(sm.delete_selection(), 2);
        assert_eq!(sm.nodes().len(), 1);
        assert!(sm.edges().is_empty());
        assert!(sm.selection().is_empty());

        assert!(sm.undo());
        assert_eq!(sm.nodes().len(), 3);
        assert_eq!(sm.edges().len(), 1);
    }

    #[test]
    fn test_duplicate_nodes_copies_inner_edges() {
        let mut sm = manager();
        let a = rect(&mut sm, 0.0, 0.0);
        let b = rect(&mut sm, 200.0, 0.0);
        let outsider = rect(&mut sm, 400.0, 0.0);
        link(&mut sm, &a, &b).unwrap();
        link(&mut sm, &b, &outsider).unwrap();
        let depth = sm.undo_count();

        let copies = sm.duplicate_nodes(&[a.id, b.id]);
        assert_eq!(copies.len(), 2);
        assert_eq!(copies[0].position, Position2D::new(20.0, 20.0));
        assert_eq!(sm.nodes().len(), 5);
        assert_eq!(sm.edges().len(), 3);
        assert!(sm.graph().find_edge_between(copies[0].id, copies[1].id).is_some());
        assert!(copies[0].ports[1].connected);
        assert_eq!(sm.selection(), &Selection::nodes([copies[0].id, copies[1].id]));
        assert_eq!(sm.undo_count(), depth + 1);

        sm.undo();
        assert_eq!(sm.nodes().len(), 3);
        assert_eq!(sm.edges().len(), 2);
    }

    #[test]
    fn test_viewport_settings_metadata() {
        let mut sm = manager();
        let events = record_events(&sm);

        sm.set_viewport(Viewport::new(5.0, 6.0, 9.0));
        assert_eq!(sm.viewport().scale, crate::document::MAX_SCALE);
        assert_eq!(*events.borrow(), vec![EventType::ViewportChanged]);

        sm.update_settings(SettingsUpdate {
            snap_to_grid: Some(true),
            ..Default::default()
        });
        assert!(sm.settings().snap_to_grid);

        sm.update_metadata(MetadataUpdate {
            name: Some("Pipeline".to_string()),
            ..Default::default()
        });
        assert_eq!(sm.metadata().name, "Pipeline");
        assert!(!sm.can_undo());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let mut sm = manager();
        let a = rect(&mut sm, 0.0, 0.0);
        let b = sm.add_node(NodeOptions::new(NodeType::Diamond, Position2D::new(200.0, 0.0)));
        link(&mut sm, &a, &b).unwrap();
        sm.set_viewport(Viewport::new(-10.0, 4.0, 1.5));
        let saved = sm.save_document();

        let mut other = manager();
        let events = record_events(&other);
        other.load_document(saved.clone());
        assert!(events.borrow().contains(&EventType::DocumentLoaded));
        assert!(!other.can_undo());
        assert!(!other.can_redo());
        assert!(other.selection().is_empty());

        let resaved = other.save_document();
        assert_eq!(resaved.nodes, saved.nodes);
        assert_eq!(resaved.edges, saved.edges);
        assert_eq!(resaved.viewport, saved.viewport);
        assert_eq!(resaved.settings, saved.settings);
        assert_eq!(resaved.metadata.id, saved.metadata.id);
    }

    #[test]
    fn test_json_document_io() {
        let mut sm = manager();
        rect(&mut sm, 0.0, 0.0);
        let json = sm.save_document_json().unwrap();

        let mut other = manager();
        other.load_document_json(&json).unwrap();
        assert_eq!(other.nodes().len(), 1);

        assert!(other.load_document_json("not json").is_err());
        assert_eq!(other.nodes().len(), 1);
    }

    #[test]
    fn test_undo_emits_entity_events() {
        let mut sm = manager();
        let n = rect(&mut sm, 0.0, 0.0);
        sm.move_node(n.id, Position2D::new(9.0, 9.0));

        let events = record_events(&sm);
        sm.undo();
        sm.undo();
        assert_eq!(
            *events.borrow(),
            vec![
                EventType::NodeMoved,
                EventType::HistoryChanged,
                EventType::NodeDeleted,
                EventType::HistoryChanged
            ]
        );
    }
}
