//! Diagram commands
//!
//! A command is the reversible record of one applied mutation. It is created by the state manager
//! at the moment the mutation happens and carries both the prior and the resulting state, so the
//! history can replay it in either direction without consulting anything else.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::components::{Edge, EdgeStyle, Node, NodeData, NodeStyle};
use crate::value_objects::{EdgeId, NodeId, Position2D, Size};

/// Discriminant of a [`Command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    AddNode,
    DeleteNode,
    MoveNode,
    ResizeNode,
    UpdateNodeData,
    UpdateNodeStyle,
    AddEdge,
    DeleteEdge,
    UpdateEdgeStyle,
    Batch,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::AddNode => "ADD_NODE",
            CommandKind::DeleteNode => "DELETE_NODE",
            CommandKind::MoveNode => "MOVE_NODE",
            CommandKind::ResizeNode => "RESIZE_NODE",
            CommandKind::UpdateNodeData => "UPDATE_NODE_DATA",
            CommandKind::UpdateNodeStyle => "UPDATE_NODE_STYLE",
            CommandKind::AddEdge => "ADD_EDGE",
            CommandKind::DeleteEdge => "DELETE_EDGE",
            CommandKind::UpdateEdgeStyle => "UPDATE_EDGE_STYLE",
            CommandKind::Batch => "BATCH",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node was inserted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddNodeCommand {
    /// The node exactly as inserted
    pub node: Node,
}

/// A node was removed along with its incident edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteNodeCommand {
    pub node: Node,
    /// Edges removed by the cascade, restored on undo
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveNodeCommand {
    pub node_id: NodeId,
    pub old_position: Position2D,
    pub new_position: Position2D,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeNodeCommand {
    pub node_id: NodeId,
    pub old_size: Size,
    pub new_size: Size,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNodeDataCommand {
    pub node_id: NodeId,
    pub old_data: NodeData,
    pub new_data: NodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNodeStyleCommand {
    pub node_id: NodeId,
    pub old_style: NodeStyle,
    pub new_style: NodeStyle,
}

/// An edge was inserted and its endpoint ports marked connected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddEdgeCommand {
    pub edge: Edge,
    /// `connected` flag of the source port before insertion
    pub source_port_was_connected: bool,
    /// `connected` flag of the target port before insertion
    pub target_port_was_connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteEdgeCommand {
    pub edge: Edge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEdgeStyleCommand {
    pub edge_id: EdgeId,
    pub old_style: EdgeStyle,
    pub new_style: EdgeStyle,
}

/// Several commands undone and redone as one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCommand {
    /// Sub-commands in the order they were applied
    pub commands: Vec<Command>,
    pub description: String,
}

/// Reversible record of one state mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    AddNode(AddNodeCommand),
    DeleteNode(DeleteNodeCommand),
    MoveNode(MoveNodeCommand),
    ResizeNode(ResizeNodeCommand),
    UpdateNodeData(UpdateNodeDataCommand),
    UpdateNodeStyle(UpdateNodeStyleCommand),
    AddEdge(AddEdgeCommand),
    DeleteEdge(DeleteEdgeCommand),
    UpdateEdgeStyle(UpdateEdgeStyleCommand),
    Batch(BatchCommand),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::AddNode(_) => CommandKind::AddNode,
            Command::DeleteNode(_) => CommandKind::DeleteNode,
            Command::MoveNode(_) => CommandKind::MoveNode,
            Command::ResizeNode(_) => CommandKind::ResizeNode,
            Command::UpdateNodeData(_) => CommandKind::UpdateNodeData,
            Command::UpdateNodeStyle(_) => CommandKind::UpdateNodeStyle,
            Command::AddEdge(_) => CommandKind::AddEdge,
            Command::DeleteEdge(_) => CommandKind::DeleteEdge,
            Command::UpdateEdgeStyle(_) => CommandKind::UpdateEdgeStyle,
            Command::Batch(_) => CommandKind::Batch,
        }
    }

    /// Human-readable label for history menus
    pub fn description(&self) -> String {
        match self {
            Command::AddNode(_) => "Add node".to_string(),
            Command::DeleteNode(c) if c.edges.is_empty() => "Delete node".to_string(),
            Command::DeleteNode(c) => format!("Delete node and {} edge(s)", c.edges.len()),
            Command::MoveNode(_) => "Move node".to_string(),
            Command::ResizeNode(_) => "Resize node".to_string(),
            Command::UpdateNodeData(_) => "Edit node".to_string(),
            Command::UpdateNodeStyle(_) => "Style node".to_string(),
            Command::AddEdge(_) => "Add edge".to_string(),
            Command::DeleteEdge(_) => "Delete edge".to_string(),
            Command::UpdateEdgeStyle(_) => "Style edge".to_string(),
            Command::Batch(batch) => batch.description.clone(),
        }
    }

    /// Number of leaf commands, counting through nested batches
    pub fn len(&self) -> usize {
        match self {
            Command::Batch(batch) => batch.commands.iter().map(Command::len).sum(),
            _ => 1,
        }
    }

    /// Whether this is a batch with no leaves
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::NodeType;
    use crate::factories::{create_node, NodeOptions};

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     C[Command] --> K[CommandKind]
    ///     C --> D[description]
    ///     C --> L[len through batches]
    ///     C --> S[Serialization]
    /// ```

    fn move_command() -> Command {
        Command::MoveNode(MoveNodeCommand {
            node_id: NodeId::new(),
            old_position: Position2D::new(0.0, 0.0),
            new_position: Position2D::new(10.0, 0.0),
        })
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(move_command().kind(), CommandKind::MoveNode);
        assert_eq!(CommandKind::UpdateNodeStyle.to_string(), "UPDATE_NODE_STYLE");
        assert_eq!(
            serde_json::to_value(CommandKind::AddEdge).unwrap(),
            serde_json::json!("ADD_EDGE")
        );
    }

    #[test]
    fn test_batch_len_and_description() {
        let inner = Command::Batch(BatchCommand {
            commands: vec![move_command(), move_command()],
            description: "inner".to_string(),
        });
        let outer = Command::Batch(BatchCommand {
            commands: vec![inner, move_command()],
            description: "Align nodes".to_string(),
        });

        assert_eq!(outer.len(), 3);
        assert!(!outer.is_empty());
        assert_eq!(outer.description(), "Align nodes");
        assert_eq!(outer.kind(), CommandKind::Batch);
    }

    #[test]
    fn test_command_serialization() {
        let node = create_node(NodeOptions::new(NodeType::Hexagon, Position2D::default()));
        let command = Command::DeleteNode(DeleteNodeCommand { node, edges: Vec::new() });

        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["type"], "DELETE_NODE");
        assert_eq!(value["payload"]["node"]["type"], "hexagon");

        let back: Command = serde_json::from_value(value).unwrap();
        assert_eq!(back, command);
        assert_eq!(back.description(), "Delete node");
    }
}
