//! Diagram domain events
//!
//! Each payload carries the minimal data a renderer needs to update incrementally: the changed
//! entity and, where it matters, the values before and after the change.

use serde::{Deserialize, Serialize};

use crate::components::{Edge, Node};
use crate::document::{DocumentMetadata, Viewport};
use crate::handlers::Selection;
use crate::value_objects::{NodeId, Position2D, Size};

/// Node added event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAdded {
    /// The node as stored in the graph
    pub node: Node,
}

/// Node deleted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDeleted {
    /// The node that was removed
    pub node: Node,
}

/// Node data or style changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdated {
    /// The node before the change
    pub previous: Node,
    /// The node after the change
    pub node: Node,
}

/// Node position changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMoved {
    pub node_id: NodeId,
    pub old_position: Position2D,
    pub new_position: Position2D,
}

/// Node size changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResized {
    pub node_id: NodeId,
    pub old_size: Size,
    pub new_size: Size,
}

/// Edge added event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeAdded {
    pub edge: Edge,
}

/// Edge deleted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDeleted {
    pub edge: Edge,
}

/// Edge style changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeUpdated {
    pub previous: Edge,
    pub edge: Edge,
}

/// Selection replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionChanged {
    pub previous: Selection,
    pub current: Selection,
}

/// Viewport replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportChanged {
    pub previous: Viewport,
    pub current: Viewport,
}

/// A document replaced the whole editor state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLoaded {
    pub metadata: DocumentMetadata,
    pub node_count: usize,
    pub edge_count: usize,
}

/// A document snapshot was taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSaved {
    pub metadata: DocumentMetadata,
}

/// Undo or redo availability may have changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryChanged {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_count: usize,
    pub redo_count: usize,
}
