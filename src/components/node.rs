//! Node value types
//!
//! A node is a shape instance on the canvas: a type tag, geometry, style, a data payload and a
//! set of connection ports on its boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::components::visual::NodeStyle;
use crate::value_objects::{LayerId, NodeId, PortId, Position2D, Size};

/// Closed set of shape kinds a node can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// Plain process box
    #[default]
    Rectangle,
    /// Box with rounded corners, usually start/end
    RoundedRectangle,
    /// Decision point
    Diamond,
    Oval,
    Circle,
    /// Input/output
    Parallelogram,
    /// Preparation step
    Hexagon,
    Triangle,
    /// Data store
    Cylinder,
    /// Document with a wavy bottom edge
    Document,
    /// Free text without a border
    Text,
    /// Container for other nodes
    Group,
}

impl NodeType {
    /// All shape kinds, in palette order
    pub const ALL: [NodeType; 12] = [
        NodeType::Rectangle,
        NodeType::RoundedRectangle,
        NodeType::Diamond,
        NodeType::Oval,
        NodeType::Circle,
        NodeType::Parallelogram,
        NodeType::Hexagon,
        NodeType::Triangle,
        NodeType::Cylinder,
        NodeType::Document,
        NodeType::Text,
        NodeType::Group,
    ];

    /// Get the string representation of the node type
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Rectangle => "rectangle",
            NodeType::RoundedRectangle => "rounded-rectangle",
            NodeType::Diamond => "diamond",
            NodeType::Oval => "oval",
            NodeType::Circle => "circle",
            NodeType::Parallelogram => "parallelogram",
            NodeType::Hexagon => "hexagon",
            NodeType::Triangle => "triangle",
            NodeType::Cylinder => "cylinder",
            NodeType::Document => "document",
            NodeType::Text => "text",
            NodeType::Group => "group",
        }
    }

    /// Size a freshly created node of this type gets
    pub fn default_size(&self) -> Size {
        let (width, height) = match self {
            NodeType::Rectangle | NodeType::RoundedRectangle | NodeType::Parallelogram => (120.0, 60.0),
            NodeType::Diamond => (100.0, 100.0),
            NodeType::Oval | NodeType::Hexagon | NodeType::Document => (120.0, 80.0),
            NodeType::Circle => (80.0, 80.0),
            NodeType::Triangle => (100.0, 90.0),
            NodeType::Cylinder => (80.0, 100.0),
            NodeType::Text => (100.0, 40.0),
            NodeType::Group => (300.0, 200.0),
        };
        Size { width, height }
    }

    /// Whether nodes of this type hold children
    pub fn is_container(&self) -> bool {
        matches!(self, NodeType::Group)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the node boundary a port sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Top,
    Right,
    Bottom,
    Left,
}

/// Attachment point on a node boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: PortId,
    pub side: PortSide,
    /// Fraction along the side, 0 at the top/left end
    pub offset: f64,
    pub connected: bool,
}

impl Port {
    /// Create an unconnected port with a fresh id
    pub fn new(side: PortSide, offset: f64) -> Self {
        Self {
            id: PortId::new(),
            side,
            offset: crate::value_objects::clamp_fraction(offset),
            connected: false,
        }
    }
}

/// Content carried by a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub custom: Map<String, Value>,
}

/// Partial update of [`NodeData`]
///
/// `custom` entries are merged key by key; a `null` value removes the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeDataUpdate {
    pub label: Option<String>,
    pub description: Option<Option<String>>,
    pub custom: Option<Map<String, Value>>,
}

impl NodeData {
    /// Create data with just a label
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Produce new data with the update applied
    pub fn merged(&self, update: &NodeDataUpdate) -> NodeData {
        let mut custom = self.custom.clone();
        if let Some(patch) = &update.custom {
            for (key, value) in patch {
                if value.is_null() {
                    custom.remove(key);
                } else {
                    custom.insert(key.clone(), value.clone());
                }
            }
        }

        NodeData {
            label: update.label.clone().unwrap_or_else(|| self.label.clone()),
            description: match &update.description {
                Some(description) => description.clone(),
                None => self.description.clone(),
            },
            custom,
        }
    }
}

/// Bookkeeping attached to every node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub locked: bool,
    pub visible: bool,
    /// Paint and hit-test order, higher is on top
    pub z_index: i32,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            locked: false,
            visible: true,
            z_index: 0,
        }
    }
}

/// A shape instance in the diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub position: Position2D,
    pub size: Size,
    pub style: NodeStyle,
    pub data: NodeData,
    pub ports: Vec<Port>,
    pub metadata: NodeMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<LayerId>,
}

impl Node {
    /// Look up a port by id
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        self.ports.iter().find(|port| port.id == port_id)
    }

    pub fn has_port(&self, port_id: PortId) -> bool {
        self.port(port_id).is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.metadata.locked
    }

    pub fn z_index(&self) -> i32 {
        self.metadata.z_index
    }
}
