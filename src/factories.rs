//! Node and edge factories
//!
//! Pure functions that build complete node and edge values from partial options, derive copies
//! and merges of existing values, and answer the geometric questions the canvas asks about a
//! single node. Nothing here touches a [`crate::aggregate::Graph`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::components::{
    ArrowHead, Edge, EdgeEndpoint, EdgeLabel, EdgeMetadata, EdgeStyle, EdgeStyleUpdate, EdgeType,
    Node, NodeData, NodeMetadata, NodeStyle, NodeStyleUpdate, NodeType, Port, PortSide,
};
use crate::value_objects::{clamp_fraction, Bounds, EdgeId, LayerId, NodeId, PortId, Position2D, Size};

/// Offset applied to a cloned node when no explicit position is given
pub const CLONE_OFFSET: f64 = 20.0;

/// Partial description of a node to create
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeOptions {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub position: Position2D,
    /// Falls back to [`NodeType::default_size`]
    pub size: Option<Size>,
    pub style: Option<NodeStyleUpdate>,
    pub data: Option<NodeData>,
    /// Falls back to [`default_ports`]
    pub ports: Option<Vec<Port>>,
    pub parent_id: Option<NodeId>,
    pub layer_id: Option<LayerId>,
    pub z_index: Option<i32>,
}

impl NodeOptions {
    /// Options for a node of `node_type` at `position`
    pub fn new(node_type: NodeType, position: Position2D) -> Self {
        Self {
            node_type,
            position,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let mut data = self.data.take().unwrap_or_default();
        data.label = label.into();
        self.data = Some(data);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }
}

/// Partial description of an edge to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeOptions {
    pub source_node_id: NodeId,
    pub source_port_id: PortId,
    pub target_node_id: NodeId,
    pub target_port_id: PortId,
    #[serde(default, rename = "type")]
    pub edge_type: Option<EdgeType>,
    #[serde(default)]
    pub waypoints: Vec<Position2D>,
    #[serde(default)]
    pub style: Option<EdgeStyleUpdate>,
    #[serde(default)]
    pub label: Option<EdgeLabel>,
    #[serde(default)]
    pub source_arrow: Option<ArrowHead>,
    #[serde(default)]
    pub target_arrow: Option<ArrowHead>,
}

impl EdgeOptions {
    /// Options connecting two ports with default routing and styling
    pub fn new(
        source_node_id: NodeId,
        source_port_id: PortId,
        target_node_id: NodeId,
        target_port_id: PortId,
    ) -> Self {
        Self {
            source_node_id,
            source_port_id,
            target_node_id,
            target_port_id,
            edge_type: None,
            waypoints: Vec::new(),
            style: None,
            label: None,
            source_arrow: None,
            target_arrow: None,
        }
    }

    pub fn with_type(mut self, edge_type: EdgeType) -> Self {
        self.edge_type = Some(edge_type);
        self
    }

    pub fn with_label(mut self, text: impl Into<String>) -> Self {
        self.label = Some(EdgeLabel::new(text));
        self
    }
}

/// Fields of a node that may change after creation
///
/// There is no id field; a node's id is fixed for its lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub node_type: Option<NodeType>,
    pub position: Option<Position2D>,
    pub size: Option<Size>,
    pub style: Option<NodeStyle>,
    pub data: Option<NodeData>,
    pub ports: Option<Vec<Port>>,
    pub parent_id: Option<Option<NodeId>>,
    pub layer_id: Option<Option<LayerId>>,
    pub locked: Option<bool>,
    pub visible: Option<bool>,
    pub z_index: Option<i32>,
}

impl NodeUpdate {
    pub fn position(position: Position2D) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn size(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn style(style: NodeStyle) -> Self {
        Self {
            style: Some(style),
            ..Default::default()
        }
    }

    pub fn data(data: NodeData) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn ports(ports: Vec<Port>) -> Self {
        Self {
            ports: Some(ports),
            ..Default::default()
        }
    }
}

/// Fields of an edge that may change after creation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeUpdate {
    pub edge_type: Option<EdgeType>,
    pub waypoints: Option<Vec<Position2D>>,
    pub style: Option<EdgeStyle>,
    pub label: Option<Option<EdgeLabel>>,
    pub source_arrow: Option<ArrowHead>,
    pub target_arrow: Option<ArrowHead>,
    pub z_index: Option<i32>,
}

impl EdgeUpdate {
    pub fn style(style: EdgeStyle) -> Self {
        Self {
            style: Some(style),
            ..Default::default()
        }
    }
}

/// Ports a new node of `node_type` receives
pub fn default_ports(node_type: NodeType) -> Vec<Port> {
    match node_type {
        NodeType::Group => Vec::new(),
        NodeType::Triangle => vec![
            Port::new(PortSide::Top, 0.5),
            Port::new(PortSide::Bottom, 0.25),
            Port::new(PortSide::Bottom, 0.75),
        ],
        _ => [PortSide::Top, PortSide::Right, PortSide::Bottom, PortSide::Left]
            .into_iter()
            .map(|side| Port::new(side, 0.5))
            .collect(),
    }
}

/// Build a complete node from options
pub fn create_node(options: NodeOptions) -> Node {
    let style = match &options.style {
        Some(update) => NodeStyle::default().merged(update),
        None => NodeStyle::default(),
    };
    let metadata = NodeMetadata {
        z_index: options.z_index.unwrap_or(0),
        ..NodeMetadata::default()
    };

    Node {
        id: NodeId::new(),
        node_type: options.node_type,
        position: options.position,
        size: match options.size {
            Some(size) if size.is_valid() => size,
            Some(size) => {
                warn!(width = size.width, height = size.height, "Ignoring invalid node size");
                options.node_type.default_size()
            }
            None => options.node_type.default_size(),
        },
        style,
        data: options.data.unwrap_or_default(),
        ports: match options.ports {
            Some(ports) => normalize_ports(ports),
            None => default_ports(options.node_type),
        },
        metadata,
        parent_id: options.parent_id,
        layer_id: options.layer_id,
    }
}

/// Clamp offsets into 0..=1 and re-key ports whose id repeats an earlier one
fn normalize_ports(ports: Vec<Port>) -> Vec<Port> {
    let mut seen: HashSet<PortId> = HashSet::new();
    ports
        .into_iter()
        .map(|port| Port {
            id: if seen.insert(port.id) { port.id } else { PortId::new() },
            offset: clamp_fraction(port.offset),
            ..port
        })
        .collect()
}

/// Build a complete edge from options
pub fn create_edge(options: EdgeOptions) -> Edge {
    let style = match &options.style {
        Some(update) => EdgeStyle::default().merged(update),
        None => EdgeStyle::default(),
    };

    Edge {
        id: EdgeId::new(),
        edge_type: options.edge_type.unwrap_or_default(),
        source: EdgeEndpoint::new(options.source_node_id, options.source_port_id),
        target: EdgeEndpoint::new(options.target_node_id, options.target_port_id),
        waypoints: options.waypoints,
        style,
        label: options.label,
        source_arrow: options.source_arrow.unwrap_or(ArrowHead::None),
        target_arrow: options.target_arrow.unwrap_or(ArrowHead::Arrow),
        metadata: EdgeMetadata::default(),
    }
}

/// Copy a node under a fresh id with fresh, unconnected ports
pub fn clone_node(node: &Node, position: Option<Position2D>) -> Node {
    let now = Utc::now();
    Node {
        id: NodeId::new(),
        position: position.unwrap_or_else(|| node.position.offset(CLONE_OFFSET, CLONE_OFFSET)),
        ports: node
            .ports
            .iter()
            .map(|port| Port {
                id: PortId::new(),
                connected: false,
                ..port.clone()
            })
            .collect(),
        metadata: NodeMetadata {
            created_at: now,
            updated_at: now,
            ..node.metadata.clone()
        },
        ..node.clone()
    }
}

/// Copy an edge under a fresh id
pub fn clone_edge(edge: &Edge) -> Edge {
    let now = Utc::now();
    Edge {
        id: EdgeId::new(),
        metadata: EdgeMetadata {
            created_at: now,
            updated_at: now,
            ..edge.metadata.clone()
        },
        ..edge.clone()
    }
}

/// Merge `update` into a copy of `node`, refreshing `updated_at`
pub fn update_node(node: &Node, update: NodeUpdate) -> Node {
    let mut next = node.clone();
    if let Some(node_type) = update.node_type {
        next.node_type = node_type;
    }
    if let Some(position) = update.position {
        next.position = position;
    }
    if let Some(size) = update.size {
        next.size = size;
    }
    if let Some(style) = update.style {
        next.style = style;
    }
    if let Some(data) = update.data {
        next.data = data;
    }
    if let Some(ports) = update.ports {
        next.ports = ports;
    }
    if let Some(parent_id) = update.parent_id {
        next.parent_id = parent_id;
    }
    if let Some(layer_id) = update.layer_id {
        next.layer_id = layer_id;
    }
    if let Some(locked) = update.locked {
        next.metadata.locked = locked;
    }
    if let Some(visible) = update.visible {
        next.metadata.visible = visible;
    }
    if let Some(z_index) = update.z_index {
        next.metadata.z_index = z_index;
    }
    next.metadata.updated_at = Utc::now();
    next
}

/// Merge `update` into a copy of `edge`, refreshing `updated_at`
pub fn update_edge(edge: &Edge, update: EdgeUpdate) -> Edge {
    let mut next = edge.clone();
    if let Some(edge_type) = update.edge_type {
        next.edge_type = edge_type;
    }
    if let Some(waypoints) = update.waypoints {
        next.waypoints = waypoints;
    }
    if let Some(style) = update.style {
        next.style = style;
    }
    if let Some(label) = update.label {
        next.label = label;
    }
    if let Some(arrow) = update.source_arrow {
        next.source_arrow = arrow;
    }
    if let Some(arrow) = update.target_arrow {
        next.target_arrow = arrow;
    }
    if let Some(z_index) = update.z_index {
        next.metadata.z_index = z_index;
    }
    next.metadata.updated_at = Utc::now();
    next
}

/// Rectangle occupied by the node
pub fn node_bounds(node: &Node) -> Bounds {
    Bounds::from_rect(node.position, node.size)
}

pub fn node_center(node: &Node) -> Position2D {
    Position2D::new(
        node.position.x + node.size.width / 2.0,
        node.position.y + node.size.height / 2.0,
    )
}

/// Absolute canvas position of a port
pub fn port_position(node: &Node, port_id: PortId) -> Option<Position2D> {
    let port = node.port(port_id)?;
    let Position2D { x, y } = node.position;
    let Size { width, height } = node.size;

    let point = match port.side {
        PortSide::Top => Position2D::new(x + width * port.offset, y),
        PortSide::Bottom => Position2D::new(x + width * port.offset, y + height),
        PortSide::Left => Position2D::new(x, y + height * port.offset),
        PortSide::Right => Position2D::new(x + width, y + height * port.offset),
    };
    Some(point)
}

/// Inclusive point-in-rectangle test
pub fn is_point_in_node(point: &Position2D, node: &Node) -> bool {
    node_bounds(node).contains_point(point)
}

/// Strict overlap test; nodes that only touch do not overlap
pub fn do_nodes_overlap(a: &Node, b: &Node) -> bool {
    let a = node_bounds(a);
    let b = node_bounds(b);
    !(a.right() <= b.x || b.right() <= a.x || a.bottom() <= b.y || b.bottom() <= a.y)
}
