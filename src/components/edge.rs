//! Edge value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::visual::{EdgeStyle, LabelStyle};
use crate::value_objects::{EdgeId, NodeId, PortId, Position2D};

/// Routing style of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Smooth cubic curve
    #[default]
    Bezier,
    /// Horizontal and vertical segments only
    Orthogonal,
    Straight,
    /// Orthogonal with sharp corners
    Step,
}

/// Marker drawn at an edge end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrowHead {
    #[default]
    None,
    Arrow,
    OpenArrow,
    Diamond,
    Circle,
}

/// One end of an edge: a node and one of its ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeEndpoint {
    pub node_id: NodeId,
    pub port_id: PortId,
}

impl EdgeEndpoint {
    pub fn new(node_id: NodeId, port_id: PortId) -> Self {
        Self { node_id, port_id }
    }
}

/// Text placed along an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLabel {
    pub text: String,
    /// Fraction along the path, 0 at the source
    pub position: f64,
    pub offset: Position2D,
    #[serde(default)]
    pub style: LabelStyle,
}

impl EdgeLabel {
    /// Label centered on the path
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: 0.5,
            offset: Position2D::default(),
            style: LabelStyle::default(),
        }
    }
}

/// Bookkeeping attached to every edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub z_index: i32,
}

impl Default for EdgeMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            z_index: 0,
        }
    }
}

/// A directed connection between two node ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub source: EdgeEndpoint,
    pub target: EdgeEndpoint,
    #[serde(default)]
    pub waypoints: Vec<Position2D>,
    pub style: EdgeStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<EdgeLabel>,
    pub source_arrow: ArrowHead,
    pub target_arrow: ArrowHead,
    pub metadata: EdgeMetadata,
}

impl Edge {
    pub fn source_node(&self) -> NodeId {
        self.source.node_id
    }

    pub fn target_node(&self) -> NodeId {
        self.target.node_id
    }

    /// Whether either end touches `node_id`
    pub fn touches(&self, node_id: NodeId) -> bool {
        self.source.node_id == node_id || self.target.node_id == node_id
    }

    pub fn is_self_loop(&self) -> bool {
        self.source.node_id == self.target.node_id
    }

    /// The node at the opposite end from `node_id`
    pub fn other_end(&self, node_id: NodeId) -> Option<NodeId> {
        if self.source.node_id == node_id {
            Some(self.target.node_id)
        } else if self.target.node_id == node_id {
            Some(self.source.node_id)
        } else {
            None
        }
    }
}
