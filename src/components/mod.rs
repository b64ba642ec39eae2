//! Components of the diagram domain
//!
//! Plain value types describing nodes, edges and their visual styles. They carry no behavior
//! beyond simple accessors and merges; construction lives in [`crate::factories`].

pub mod edge;
pub mod node;
pub mod visual;

pub use node::{Node, NodeData, NodeDataUpdate, NodeMetadata, NodeType, Port, PortSide};

pub use edge::{ArrowHead, Edge, EdgeEndpoint, EdgeLabel, EdgeMetadata, EdgeType};

pub use visual::{
    EdgeStyle, EdgeStyleUpdate, FontWeight, LabelStyle, NodeStyle, NodeStyleUpdate, StrokeStyle,
    TextAlign,
};
