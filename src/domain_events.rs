//! Domain events enum for the diagram domain

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::{
    DocumentLoaded, DocumentSaved, EdgeAdded, EdgeDeleted, EdgeUpdated, HistoryChanged, NodeAdded,
    NodeDeleted, NodeMoved, NodeResized, NodeUpdated, SelectionChanged, ViewportChanged,
};

/// Names under which observers subscribe to events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "node:added")]
    NodeAdded,
    #[serde(rename = "node:deleted")]
    NodeDeleted,
    #[serde(rename = "node:updated")]
    NodeUpdated,
    #[serde(rename = "node:moved")]
    NodeMoved,
    #[serde(rename = "node:resized")]
    NodeResized,
    #[serde(rename = "edge:added")]
    EdgeAdded,
    #[serde(rename = "edge:deleted")]
    EdgeDeleted,
    #[serde(rename = "edge:updated")]
    EdgeUpdated,
    #[serde(rename = "selection:changed")]
    SelectionChanged,
    #[serde(rename = "viewport:changed")]
    ViewportChanged,
    #[serde(rename = "document:loaded")]
    DocumentLoaded,
    #[serde(rename = "document:saved")]
    DocumentSaved,
    #[serde(rename = "history:changed")]
    HistoryChanged,
}

impl EventType {
    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::NodeAdded => "node:added",
            EventType::NodeDeleted => "node:deleted",
            EventType::NodeUpdated => "node:updated",
            EventType::NodeMoved => "node:moved",
            EventType::NodeResized => "node:resized",
            EventType::EdgeAdded => "edge:added",
            EventType::EdgeDeleted => "edge:deleted",
            EventType::EdgeUpdated => "edge:updated",
            EventType::SelectionChanged => "selection:changed",
            EventType::ViewportChanged => "viewport:changed",
            EventType::DocumentLoaded => "document:loaded",
            EventType::DocumentSaved => "document:saved",
            EventType::HistoryChanged => "history:changed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enum wrapper for diagram domain events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DiagramDomainEvent {
    #[serde(rename = "node:added")]
    NodeAdded(NodeAdded),
    #[serde(rename = "node:deleted")]
    NodeDeleted(NodeDeleted),
    #[serde(rename = "node:updated")]
    NodeUpdated(NodeUpdated),
    #[serde(rename = "node:moved")]
    NodeMoved(NodeMoved),
    #[serde(rename = "node:resized")]
    NodeResized(NodeResized),
    #[serde(rename = "edge:added")]
    EdgeAdded(EdgeAdded),
    #[serde(rename = "edge:deleted")]
    EdgeDeleted(EdgeDeleted),
    #[serde(rename = "edge:updated")]
    EdgeUpdated(EdgeUpdated),
    #[serde(rename = "selection:changed")]
    SelectionChanged(SelectionChanged),
    #[serde(rename = "viewport:changed")]
    ViewportChanged(ViewportChanged),
    #[serde(rename = "document:loaded")]
    DocumentLoaded(DocumentLoaded),
    #[serde(rename = "document:saved")]
    DocumentSaved(DocumentSaved),
    #[serde(rename = "history:changed")]
    HistoryChanged(HistoryChanged),
}

impl DiagramDomainEvent {
    /// The type observers subscribe to for this event
    pub fn event_type(&self) -> EventType {
        match self {
            Self::NodeAdded(_) => EventType::NodeAdded,
            Self::NodeDeleted(_) => EventType::NodeDeleted,
            Self::NodeUpdated(_) => EventType::NodeUpdated,
            Self::NodeMoved(_) => EventType::NodeMoved,
            Self::NodeResized(_) => EventType::NodeResized,
            Self::EdgeAdded(_) => EventType::EdgeAdded,
            Self::EdgeDeleted(_) => EventType::EdgeDeleted,
            Self::EdgeUpdated(_) => EventType::EdgeUpdated,
            Self::SelectionChanged(_) => EventType::SelectionChanged,
            Self::ViewportChanged(_) => EventType::ViewportChanged,
            Self::DocumentLoaded(_) => EventType::DocumentLoaded,
            Self::DocumentSaved(_) => EventType::DocumentSaved,
            Self::HistoryChanged(_) => EventType::HistoryChanged,
        }
    }
}
